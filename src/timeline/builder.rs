use std::cmp::Ordering;

use crate::foundation::core::Fps;
use crate::foundation::error::{PianoError, PianoResult};
use crate::keyboard::range::KeyRange;
use crate::midi::pattern::{MidiPattern, TrackEvent, TrackEventKind};

/// Tempo assumed until the first set-tempo event (120 BPM).
pub const DEFAULT_TEMPO_MICROS_PER_QUARTER: u32 = 500_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum NoteKind {
    NoteOn,
    NoteOff,
}

/// A note event placed on the absolute time axis.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct NoteEvent {
    pub timestamp_micros: f64,
    pub note: u8,
    pub kind: NoteKind,
    pub velocity: u8,
}

impl NoteEvent {
    /// NoteOff, or NoteOn with velocity 0.
    pub fn is_release(&self) -> bool {
        matches!(self.kind, NoteKind::NoteOff) || self.velocity == 0
    }
}

/// Inclusive note bounds applied while building; a missing end is unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub lowest: Option<u8>,
    pub highest: Option<u8>,
}

impl NoteFilter {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(lowest: Option<u8>, highest: Option<u8>) -> Self {
        Self { lowest, highest }
    }

    pub fn contains(&self, note: u8) -> bool {
        self.lowest.is_none_or(|lo| note >= lo) && self.highest.is_none_or(|hi| note <= hi)
    }
}

impl From<KeyRange> for NoteFilter {
    fn from(range: KeyRange) -> Self {
        Self::between(Some(range.from()), Some(range.to()))
    }
}

/// Globally time-ordered note events plus the facts the rest of a run needs.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Timeline {
    events: Vec<NoteEvent>,
    duration_micros: f64,
    lowest_note: Option<u8>,
    highest_note: Option<u8>,
}

impl Timeline {
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// Timestamp of the last note event in the file, including filtered ones.
    pub fn duration_micros(&self) -> f64 {
        self.duration_micros
    }

    pub fn lowest_note(&self) -> Option<u8> {
        self.lowest_note
    }

    pub fn highest_note(&self) -> Option<u8> {
        self.highest_note
    }

    /// Lowest and highest retained note, `None` when no event survived filtering.
    pub fn note_span(&self) -> Option<(u8, u8)> {
        self.lowest_note.zip(self.highest_note)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_frames(&self, fps: Fps) -> u64 {
        fps.frames_for_micros_ceil(self.duration_micros)
    }

    /// Drop events outside `range`. Duration is unchanged.
    pub fn restrict_to(mut self, range: KeyRange) -> Self {
        self.events.retain(|e| range.contains(e.note));
        self.lowest_note = self.events.iter().map(|e| e.note).min();
        self.highest_note = self.events.iter().map(|e| e.note).max();
        self
    }
}

/// Converts per-track tick deltas into a [`Timeline`].
///
/// Tempo is a single running value carried across tracks in file order: a set-tempo event
/// applies to every later conversion, and earlier timestamps are never corrected.
#[derive(Clone, Debug)]
pub struct TimelineBuilder {
    ticks_per_beat: Option<u16>,
    filter: NoteFilter,
}

impl TimelineBuilder {
    pub fn new(ticks_per_beat: Option<u16>) -> Self {
        Self {
            ticks_per_beat,
            filter: NoteFilter::unbounded(),
        }
    }

    pub fn for_pattern(pattern: &MidiPattern) -> Self {
        Self::new(pattern.ticks_per_beat)
    }

    pub fn with_filter(mut self, filter: NoteFilter) -> Self {
        self.filter = filter;
        self
    }

    #[tracing::instrument(skip(self, tracks), fields(tracks = tracks.len()))]
    pub fn build(&self, tracks: &[Vec<TrackEvent>]) -> PianoResult<Timeline> {
        let tpb = match self.ticks_per_beat {
            Some(0) => return Err(PianoError::midi_format("ticks per beat is zero")),
            None => {
                return Err(PianoError::midi_format(
                    "ticks per beat is missing (SMPTE timecode timing is not supported)",
                ));
            }
            Some(t) => f64::from(t),
        };

        let mut micros_per_tick = f64::from(DEFAULT_TEMPO_MICROS_PER_QUARTER) / tpb;
        let mut events = Vec::new();
        let mut duration_micros = 0.0_f64;

        for track in tracks {
            let mut abs_ticks: u64 = 0;
            for ev in track {
                abs_ticks += u64::from(ev.delta_ticks);
                let (note, kind, velocity) = match ev.kind {
                    TrackEventKind::Tempo { micros_per_quarter } => {
                        micros_per_tick = f64::from(micros_per_quarter) / tpb;
                        continue;
                    }
                    TrackEventKind::Other => continue,
                    TrackEventKind::NoteOn { note, velocity } => (note, NoteKind::NoteOn, velocity),
                    TrackEventKind::NoteOff { note, velocity } => {
                        (note, NoteKind::NoteOff, velocity)
                    }
                };

                let timestamp_micros = abs_ticks as f64 * micros_per_tick;
                duration_micros = duration_micros.max(timestamp_micros);
                if !self.filter.contains(note) {
                    continue;
                }
                events.push(NoteEvent {
                    timestamp_micros,
                    note,
                    kind,
                    velocity,
                });
            }
        }

        // Stable: ties keep track order, then in-track order.
        events.sort_by(|a, b| {
            a.timestamp_micros
                .partial_cmp(&b.timestamp_micros)
                .unwrap_or(Ordering::Equal)
        });

        let lowest_note = events.iter().map(|e| e.note).min();
        let highest_note = events.iter().map(|e| e.note).max();
        tracing::info!(
            events = events.len(),
            duration_ms = duration_micros / 1000.0,
            "timeline built"
        );

        Ok(Timeline {
            events,
            duration_micros,
            lowest_note,
            highest_note,
        })
    }
}

/// Build the timeline of a whole pattern.
pub fn build_timeline(pattern: &MidiPattern, filter: NoteFilter) -> PianoResult<Timeline> {
    TimelineBuilder::for_pattern(pattern)
        .with_filter(filter)
        .build(&pattern.tracks)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/builder.rs"]
mod tests;
