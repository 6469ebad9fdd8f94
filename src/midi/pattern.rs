/// A parsed MIDI file reduced to what the timeline needs.
///
/// Ticks are relative to the previous event of the same track, as stored in the file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MidiPattern {
    /// Ticks per quarter note. `None` when the file uses SMPTE timecode timing.
    pub ticks_per_beat: Option<u16>,
    pub tracks: Vec<Vec<TrackEvent>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackEvent {
    pub delta_ticks: u32,
    pub kind: TrackEventKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackEventKind {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    /// Set tempo meta event.
    Tempo { micros_per_quarter: u32 },
    /// Anything the renderer does not care about (controllers, text, end of track, ...).
    Other,
}

impl TrackEvent {
    pub fn note_on(delta_ticks: u32, note: u8, velocity: u8) -> Self {
        Self {
            delta_ticks,
            kind: TrackEventKind::NoteOn { note, velocity },
        }
    }

    pub fn note_off(delta_ticks: u32, note: u8) -> Self {
        Self {
            delta_ticks,
            kind: TrackEventKind::NoteOff { note, velocity: 0 },
        }
    }

    pub fn tempo(delta_ticks: u32, micros_per_quarter: u32) -> Self {
        Self {
            delta_ticks,
            kind: TrackEventKind::Tempo { micros_per_quarter },
        }
    }

    pub fn other(delta_ticks: u32) -> Self {
        Self {
            delta_ticks,
            kind: TrackEventKind::Other,
        }
    }
}
