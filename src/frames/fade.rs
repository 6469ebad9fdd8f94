use std::collections::BTreeMap;

use crate::foundation::color::Rgb8;
use crate::timeline::builder::NoteEvent;

/// Fade position of one note. Steps are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FadePhase {
    Off,
    FadingIn(usize),
    SteadyOn,
    FadingOut(usize),
}

impl FadePhase {
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Lightness adjustments per fade step, see [`Rgb8::adjust_lightness`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FadeProfile {
    pub fade_in: Vec<f64>,
    pub fade_out: Vec<f64>,
}

pub const DEFAULT_FADE_IN: [f64; 4] = [-0.2, -0.2, -0.2, -0.1];
pub const DEFAULT_FADE_OUT: [f64; 9] = [0.4, 0.5, 0.5, 0.6, 0.6, 0.6, 0.6, 0.8, 0.8];

impl Default for FadeProfile {
    fn default() -> Self {
        Self {
            fade_in: DEFAULT_FADE_IN.to_vec(),
            fade_out: DEFAULT_FADE_OUT.to_vec(),
        }
    }
}

impl FadeProfile {
    /// Notes switch on and off instantly.
    pub fn disabled() -> Self {
        Self {
            fade_in: Vec::new(),
            fade_out: Vec::new(),
        }
    }

    pub fn fade_in_steps(&self) -> usize {
        self.fade_in.len()
    }

    pub fn fade_out_steps(&self) -> usize {
        self.fade_out.len()
    }
}

/// Every color a note can take, resolved once per run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FadePalette {
    highlight: Rgb8,
    fade_in: Vec<Rgb8>,
    fade_out_white: Vec<Rgb8>,
    fade_out_black: Vec<Rgb8>,
}

impl FadePalette {
    pub fn new(highlight: Rgb8, profile: &FadeProfile) -> Self {
        Self {
            highlight,
            fade_in: profile
                .fade_in
                .iter()
                .map(|&a| highlight.adjust_lightness(a))
                .collect(),
            // White keys fade towards white, black keys towards black.
            fade_out_white: profile
                .fade_out
                .iter()
                .map(|&a| highlight.adjust_lightness(a))
                .collect(),
            fade_out_black: profile
                .fade_out
                .iter()
                .map(|&a| highlight.adjust_lightness(-a))
                .collect(),
        }
    }

    pub fn highlight(&self) -> Rgb8 {
        self.highlight
    }

    pub fn fade_in_steps(&self) -> usize {
        self.fade_in.len()
    }

    pub fn fade_out_steps(&self) -> usize {
        self.fade_out_white.len()
    }

    /// Color for `phase`; `None` for `Off` or a step outside the profile.
    pub fn color_for(&self, phase: FadePhase, is_white: bool) -> Option<Rgb8> {
        match phase {
            FadePhase::Off => None,
            FadePhase::SteadyOn => Some(self.highlight),
            FadePhase::FadingIn(k) => self.fade_in.get(k.checked_sub(1)?).copied(),
            FadePhase::FadingOut(k) => {
                let steps = if is_white {
                    &self.fade_out_white
                } else {
                    &self.fade_out_black
                };
                steps.get(k.checked_sub(1)?).copied()
            }
        }
    }
}

/// Per-note fade phases. Only non-`Off` notes are stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FadeTable {
    fade_in_steps: usize,
    fade_out_steps: usize,
    phases: BTreeMap<u8, FadePhase>,
}

impl FadeTable {
    pub fn new(fade_in_steps: usize, fade_out_steps: usize) -> Self {
        Self {
            fade_in_steps,
            fade_out_steps,
            phases: BTreeMap::new(),
        }
    }

    pub fn for_palette(palette: &FadePalette) -> Self {
        Self::new(palette.fade_in_steps(), palette.fade_out_steps())
    }

    pub fn apply(&mut self, event: &NoteEvent) {
        if event.is_release() {
            self.release(event.note);
        } else {
            self.press(event.note);
        }
    }

    /// A press always restarts the fade-in, discarding any fade-out in progress.
    pub fn press(&mut self, note: u8) {
        let phase = if self.fade_in_steps == 0 {
            FadePhase::SteadyOn
        } else {
            FadePhase::FadingIn(1)
        };
        self.phases.insert(note, phase);
    }

    /// Releases of notes that are off or already fading out are ignored.
    pub fn release(&mut self, note: u8) {
        let Some(phase) = self.phases.get_mut(&note) else {
            return;
        };
        match *phase {
            FadePhase::FadingIn(_) | FadePhase::SteadyOn => {
                if self.fade_out_steps == 0 {
                    self.phases.remove(&note);
                } else {
                    *phase = FadePhase::FadingOut(1);
                }
            }
            FadePhase::FadingOut(_) | FadePhase::Off => {}
        }
    }

    /// Step every fade once. Called after a frame has been snapshotted.
    pub fn advance(&mut self) {
        let (n, m) = (self.fade_in_steps, self.fade_out_steps);
        self.phases.retain(|_, phase| {
            *phase = match *phase {
                FadePhase::FadingIn(k) if k >= n => FadePhase::SteadyOn,
                FadePhase::FadingIn(k) => FadePhase::FadingIn(k + 1),
                FadePhase::FadingOut(k) if k >= m => FadePhase::Off,
                FadePhase::FadingOut(k) => FadePhase::FadingOut(k + 1),
                other => other,
            };
            phase.is_active()
        });
    }

    pub fn phase(&self, note: u8) -> FadePhase {
        self.phases.get(&note).copied().unwrap_or(FadePhase::Off)
    }

    /// Active notes in ascending order.
    pub fn active(&self) -> impl Iterator<Item = (u8, FadePhase)> + '_ {
        self.phases.iter().map(|(&n, &p)| (n, p))
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frames/fade.rs"]
mod tests;
