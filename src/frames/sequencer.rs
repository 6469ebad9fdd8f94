use std::collections::BTreeMap;

use crate::foundation::color::Rgb8;
use crate::foundation::core::{FrameIndex, Fps};
use crate::frames::fade::{FadePalette, FadeTable};
use crate::keyboard::pitch::is_white_key;
use crate::timeline::builder::Timeline;

/// Highlighted notes of one frame and their colors, ascending by note.
pub type ActiveNotes = BTreeMap<u8, Rgb8>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameState {
    pub index: FrameIndex,
    pub active: ActiveNotes,
}

/// Number of frames covering `duration_micros`.
pub fn total_frames(duration_micros: f64, fps: Fps) -> u64 {
    fps.frames_for_micros_ceil(duration_micros)
}

/// Walks a [`Timeline`] one output frame at a time.
///
/// For each frame, every event up to the end of the frame's window is applied, the active set
/// is snapshotted, then all fades step once. Events are consumed through a cursor that only
/// moves forward.
pub struct FrameSequencer<'a> {
    timeline: &'a Timeline,
    palette: &'a FadePalette,
    table: FadeTable,
    fps: Fps,
    cursor: usize,
    next: u64,
    total: u64,
}

impl<'a> FrameSequencer<'a> {
    pub fn new(timeline: &'a Timeline, palette: &'a FadePalette, fps: Fps) -> Self {
        Self {
            timeline,
            palette,
            table: FadeTable::for_palette(palette),
            fps,
            cursor: 0,
            next: 0,
            total: total_frames(timeline.duration_micros(), fps),
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    fn snapshot(&self) -> ActiveNotes {
        self.table
            .active()
            .filter_map(|(note, phase)| {
                self.palette
                    .color_for(phase, is_white_key(note))
                    .map(|c| (note, c))
            })
            .collect()
    }
}

impl Iterator for FrameSequencer<'_> {
    type Item = FrameState;

    fn next(&mut self) -> Option<FrameState> {
        if self.next >= self.total {
            return None;
        }
        let index = FrameIndex(self.next);
        let window_end = self.fps.frame_end_micros(index);

        let events = self.timeline.events();
        while let Some(ev) = events.get(self.cursor) {
            if ev.timestamp_micros > window_end {
                break;
            }
            self.table.apply(ev);
            self.cursor += 1;
        }

        let active = self.snapshot();
        self.table.advance();
        self.next += 1;
        Some(FrameState { index, active })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.total - self.next).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frames/sequencer.rs"]
mod tests;
