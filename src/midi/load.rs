use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{PianoError, PianoResult};
use crate::midi::pattern::{MidiPattern, TrackEvent, TrackEventKind};

/// Byte offset of the first track chunk's length field in a single-track file.
const FIRST_TRACK_LENGTH_OFFSET: usize = 18;
/// Header chunk (14 bytes) plus the first track chunk header (8 bytes).
const FIRST_TRACK_DATA_OFFSET: usize = 22;

/// Read and parse a MIDI file from disk.
pub fn load_pattern(path: &Path) -> PianoResult<MidiPattern> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read midi file '{}'", path.display()))?;
    parse_pattern(&bytes).map_err(|e| match e {
        PianoError::MidiFormat(msg) => {
            PianoError::midi_format(format!("'{}': {msg}", path.display()))
        }
        other => other,
    })
}

/// Parse standard MIDI file bytes into a [`MidiPattern`].
pub fn parse_pattern(bytes: &[u8]) -> PianoResult<MidiPattern> {
    let smf = midly::Smf::parse(bytes)
        .map_err(|e| PianoError::midi_format(format!("failed to parse midi data: {e}")))?;

    let ticks_per_beat = match smf.header.timing {
        midly::Timing::Metrical(tpb) => Some(tpb.as_int()),
        midly::Timing::Timecode(..) => None,
    };

    let tracks = smf
        .tracks
        .iter()
        .map(|track| track.iter().map(convert_event).collect())
        .collect();

    Ok(MidiPattern {
        ticks_per_beat,
        tracks,
    })
}

fn convert_event(event: &midly::TrackEvent<'_>) -> TrackEvent {
    use midly::{MetaMessage, MidiMessage, TrackEventKind as Kind};

    let kind = match event.kind {
        Kind::Midi {
            message: MidiMessage::NoteOn { key, vel },
            ..
        } => TrackEventKind::NoteOn {
            note: key.as_int(),
            velocity: vel.as_int(),
        },
        Kind::Midi {
            message: MidiMessage::NoteOff { key, vel },
            ..
        } => TrackEventKind::NoteOff {
            note: key.as_int(),
            velocity: vel.as_int(),
        },
        Kind::Meta(MetaMessage::Tempo(t)) => TrackEventKind::Tempo {
            micros_per_quarter: t.as_int(),
        },
        _ => TrackEventKind::Other,
    };

    TrackEvent {
        delta_ticks: event.delta.as_int(),
        kind,
    }
}

/// Rewrite the first track's chunk length to span the rest of the file.
///
/// Some recorders leave a zero or stale length in single-track files, which makes strict
/// parsers drop every event. Returns the length that was written.
pub fn repair_track_length(bytes: &mut [u8]) -> PianoResult<u32> {
    if bytes.len() < FIRST_TRACK_DATA_OFFSET {
        return Err(PianoError::midi_format(format!(
            "cannot repair track length: file is only {} bytes",
            bytes.len()
        )));
    }
    if &bytes[FIRST_TRACK_LENGTH_OFFSET - 4..FIRST_TRACK_LENGTH_OFFSET] != b"MTrk" {
        return Err(PianoError::midi_format(
            "cannot repair track length: first chunk after the header is not MTrk",
        ));
    }

    let len = u32::try_from(bytes.len() - FIRST_TRACK_DATA_OFFSET).map_err(|_| {
        PianoError::midi_format("cannot repair track length: file exceeds 4 GiB")
    })?;
    bytes[FIRST_TRACK_LENGTH_OFFSET..FIRST_TRACK_DATA_OFFSET].copy_from_slice(&len.to_be_bytes());
    tracing::info!(track_length = len, "rewrote first track chunk length");
    Ok(len)
}

#[cfg(test)]
#[path = "../../tests/unit/midi/load.rs"]
mod tests;
