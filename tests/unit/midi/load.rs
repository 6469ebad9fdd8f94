use super::*;
use midly::num::{u4, u7, u15, u24, u28};

fn midi_event(delta: u32, message: midly::MidiMessage) -> midly::TrackEvent<'static> {
    midly::TrackEvent {
        delta: u28::new(delta),
        kind: midly::TrackEventKind::Midi {
            channel: u4::new(0),
            message,
        },
    }
}

fn meta_event(delta: u32, message: midly::MetaMessage<'static>) -> midly::TrackEvent<'static> {
    midly::TrackEvent {
        delta: u28::new(delta),
        kind: midly::TrackEventKind::Meta(message),
    }
}

fn single_track_file(timing: midly::Timing) -> Vec<u8> {
    let mut smf = midly::Smf::new(midly::Header::new(midly::Format::SingleTrack, timing));
    smf.tracks.push(vec![
        meta_event(0, midly::MetaMessage::Tempo(u24::new(600_000))),
        midi_event(
            0,
            midly::MidiMessage::NoteOn {
                key: u7::new(60),
                vel: u7::new(100),
            },
        ),
        midi_event(
            480,
            midly::MidiMessage::NoteOff {
                key: u7::new(60),
                vel: u7::new(64),
            },
        ),
        midi_event(
            0,
            midly::MidiMessage::Controller {
                controller: u7::new(64),
                value: u7::new(0),
            },
        ),
        meta_event(0, midly::MetaMessage::EndOfTrack),
    ]);
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).unwrap();
    bytes
}

#[test]
fn parses_notes_tempo_and_resolution() {
    let bytes = single_track_file(midly::Timing::Metrical(u15::new(480)));
    let pattern = parse_pattern(&bytes).unwrap();

    assert_eq!(pattern.ticks_per_beat, Some(480));
    assert_eq!(
        pattern.tracks,
        vec![vec![
            TrackEvent::tempo(0, 600_000),
            TrackEvent::note_on(0, 60, 100),
            TrackEvent {
                delta_ticks: 480,
                kind: TrackEventKind::NoteOff {
                    note: 60,
                    velocity: 64,
                },
            },
            TrackEvent::other(0),
            TrackEvent::other(0),
        ]]
    );
}

#[test]
fn timecode_timing_has_no_ticks_per_beat() {
    let bytes = single_track_file(midly::Timing::Timecode(midly::Fps::Fps25, 40));
    let pattern = parse_pattern(&bytes).unwrap();
    assert_eq!(pattern.ticks_per_beat, None);
}

#[test]
fn garbage_is_a_midi_format_error() {
    let err = parse_pattern(b"definitely not midi").unwrap_err();
    assert!(matches!(err, PianoError::MidiFormat(_)), "{err}");
}

#[test]
fn missing_file_reports_path() {
    let err = load_pattern(Path::new("target/does-not-exist.mid")).unwrap_err();
    assert!(err.to_string().contains("does-not-exist.mid"), "{err}");
}

#[test]
fn repair_restores_first_track_length() {
    let original = single_track_file(midly::Timing::Metrical(u15::new(96)));
    let mut broken = original.clone();
    broken[18..22].copy_from_slice(&[0, 0, 0, 0]);

    let written = repair_track_length(&mut broken).unwrap();
    assert_eq!(written as usize, original.len() - 22);
    assert_eq!(broken, original);
}

#[test]
fn repair_rejects_truncated_files() {
    let mut tiny = vec![0u8; 10];
    assert!(repair_track_length(&mut tiny).is_err());

    let mut no_track = single_track_file(midly::Timing::Metrical(u15::new(96)));
    no_track[14..18].copy_from_slice(b"XXXX");
    assert!(repair_track_length(&mut no_track).is_err());
}
