use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{PianoError, PianoResult};
use crate::keyboard::pitch::{count_white_keys, is_white_key, note_name};

/// One end of the configured keyboard: a fixed MIDI note or `"auto"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyBound {
    /// Use the lowest/highest note found in the file.
    #[default]
    Auto,
    Note(u8),
}

impl KeyBound {
    pub fn fixed(self) -> Option<u8> {
        match self {
            Self::Auto => None,
            Self::Note(n) => Some(n),
        }
    }

    /// Fixed lower bound, moved down to a white key like [`KeyRange::new`] does.
    pub fn white_floor(self) -> Option<u8> {
        self.fixed().map(white_at_or_below)
    }

    /// Fixed upper bound, moved up to a white key like [`KeyRange::new`] does.
    pub fn white_ceil(self) -> Option<u8> {
        self.fixed().map(white_at_or_above)
    }
}

// 0 (C) and 127 (G) are white, so the outward steps cannot leave 0..=127.
fn white_at_or_below(note: u8) -> u8 {
    if is_white_key(note) { note } else { note - 1 }
}

fn white_at_or_above(note: u8) -> u8 {
    if is_white_key(note) { note } else { note + 1 }
}

impl<'de> Deserialize<'de> for KeyBound {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Note(i64),
            Word(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Note(n) => u8::try_from(n)
                .ok()
                .filter(|&n| n <= 127)
                .map(Self::Note)
                .ok_or_else(|| {
                    serde::de::Error::custom(format!("key bound {n} is outside 0..=127"))
                }),
            Repr::Word(w) if w.trim().eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            Repr::Word(w) => w
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|&n| n <= 127)
                .map(Self::Note)
                .ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "key bound must be a note number 0..=127 or \"auto\", got \"{w}\""
                    ))
                }),
        }
    }
}

/// Inclusive span of MIDI notes drawn on the keyboard. Both ends are always white keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct KeyRange {
    from: u8,
    to: u8,
}

impl KeyRange {
    /// Build a range, widening black boundaries outward to the neighbouring white key.
    pub fn new(from: u8, to: u8) -> PianoResult<Self> {
        if from > 127 || to > 127 {
            return Err(PianoError::config(format!(
                "key range {from}..={to} is outside the MIDI note range 0..=127"
            )));
        }

        let corrected_from = white_at_or_below(from);
        let corrected_to = white_at_or_above(to);

        if corrected_to <= corrected_from {
            return Err(PianoError::config(format!(
                "key range collapses: configured {from} ({})..={to} ({}), \
                 white-key aligned {corrected_from} ({})..={corrected_to} ({}); \
                 the upper key must be above the lower key",
                note_name(from),
                note_name(to),
                note_name(corrected_from),
                note_name(corrected_to),
            )));
        }

        Ok(Self {
            from: corrected_from,
            to: corrected_to,
        })
    }

    /// Resolve configured bounds, filling `auto` ends from the notes detected in the file.
    pub fn resolve(from: KeyBound, to: KeyBound, detected: Option<(u8, u8)>) -> PianoResult<Self> {
        let pick = |bound: KeyBound, found: Option<u8>, which: &str| -> PianoResult<u8> {
            match bound {
                KeyBound::Note(n) => Ok(n),
                KeyBound::Auto => found.ok_or_else(|| {
                    PianoError::config(format!(
                        "{which} key is \"auto\" but the midi file contains no notes in range"
                    ))
                }),
            }
        };

        let from = pick(from, detected.map(|(lo, _)| lo), "lowest")?;
        let to = pick(to, detected.map(|(_, hi)| hi), "highest")?;
        Self::new(from, to)
    }

    pub fn from(self) -> u8 {
        self.from
    }

    pub fn to(self) -> u8 {
        self.to
    }

    pub fn notes(self) -> RangeInclusive<u8> {
        self.from..=self.to
    }

    pub fn contains(self, note: u8) -> bool {
        self.notes().contains(&note)
    }

    pub fn len(self) -> usize {
        usize::from(self.to - self.from) + 1
    }

    pub fn is_empty(self) -> bool {
        false
    }

    pub fn white_key_count(self) -> usize {
        count_white_keys(self.from, self.to)
    }

    pub fn black_key_count(self) -> usize {
        self.len() - self.white_key_count()
    }
}

impl std::fmt::Display for KeyRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..={} ({}..={})",
            self.from,
            self.to,
            note_name(self.from),
            note_name(self.to)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/keyboard/range.rs"]
mod tests;
