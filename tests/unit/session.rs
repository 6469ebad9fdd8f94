use super::*;
use crate::keyboard::range::KeyBound;
use crate::midi::pattern::TrackEvent;
use midly::num::{u4, u7, u15, u28};

/// 500 ticks per beat at the default tempo: one tick per millisecond.
fn pattern() -> MidiPattern {
    MidiPattern {
        ticks_per_beat: Some(500),
        tracks: vec![vec![
            TrackEvent::note_on(0, 62, 90),
            TrackEvent::note_on(0, 70, 90),
            TrackEvent::note_off(400, 62),
            TrackEvent::note_off(0, 70),
            TrackEvent::note_on(600, 100, 0),
        ]],
    }
}

fn small_config() -> Config {
    let mut cfg = Config::default();
    cfg.video.width = 160;
    cfg.video.height = 40;
    cfg
}

fn fresh_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_session").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn midi_file_bytes() -> Vec<u8> {
    let ev = |delta: u32, message| midly::TrackEvent {
        delta: u28::new(delta),
        kind: midly::TrackEventKind::Midi {
            channel: u4::new(0),
            message,
        },
    };
    let mut smf = midly::Smf::new(midly::Header::new(
        midly::Format::SingleTrack,
        midly::Timing::Metrical(u15::new(480)),
    ));
    smf.tracks.push(vec![
        ev(
            0,
            midly::MidiMessage::NoteOn {
                key: u7::new(60),
                vel: u7::new(100),
            },
        ),
        ev(
            480,
            midly::MidiMessage::NoteOff {
                key: u7::new(60),
                vel: u7::new(0),
            },
        ),
    ]);
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes).unwrap();
    bytes
}

#[test]
fn auto_range_is_widened_to_white_keys() {
    let s = RenderSession::from_pattern(&pattern(), small_config()).unwrap();
    // Note 100 only appears as a velocity-0 release, yet still counts for auto bounds.
    assert_eq!((s.range().from(), s.range().to()), (62, 100));
    assert_eq!(s.total_frames(), 25);
    assert_eq!(s.layout().canvas().width, 160);
}

#[test]
fn fixed_bounds_filter_events_but_keep_duration() {
    let mut cfg = small_config();
    cfg.piano.key_from = KeyBound::Note(60);
    cfg.piano.key_to = KeyBound::Note(67);
    let s = RenderSession::from_pattern(&pattern(), cfg).unwrap();
    assert_eq!((s.range().from(), s.range().to()), (60, 67));
    assert!(s.timeline().events().iter().all(|e| e.note == 62));
    assert_eq!(s.timeline().duration_micros(), 1_000_000.0);
}

#[test]
fn black_lower_bound_keeps_events_of_the_widened_key() {
    let p = MidiPattern {
        ticks_per_beat: Some(500),
        tracks: vec![vec![
            TrackEvent::note_on(0, 60, 90),
            TrackEvent::note_on(0, 65, 90),
            TrackEvent::note_off(400, 60),
            TrackEvent::note_off(0, 65),
        ]],
    };
    let mut cfg = small_config();
    cfg.piano.key_from = KeyBound::Note(61);
    cfg.piano.key_to = KeyBound::Note(72);
    let s = RenderSession::from_pattern(&p, cfg).unwrap();

    assert_eq!((s.range().from(), s.range().to()), (60, 72));
    let notes: Vec<u8> = s.timeline().events().iter().map(|e| e.note).collect();
    assert_eq!(notes, [60, 65, 60, 65]);
    let first = s.frame_state_at(0.0);
    assert!(first.active.contains_key(&60));
    assert!(first.active.contains_key(&65));
}

#[test]
fn collapsed_range_reports_notes() {
    let mut cfg = small_config();
    cfg.piano.key_from = KeyBound::Note(64);
    cfg.piano.key_to = KeyBound::Note(64);
    let err = RenderSession::from_pattern(&pattern(), cfg).unwrap_err();
    assert!(matches!(err, PianoError::Config(_)));
    assert!(err.to_string().contains("64"), "{err}");
}

#[test]
fn frame_state_at_clamps_to_the_piece() {
    let s = RenderSession::from_pattern(&pattern(), small_config()).unwrap();
    let first = s.frame_state_at(0.0);
    assert_eq!(first.index, FrameIndex(0));
    assert!(first.active.contains_key(&62));

    let late = s.frame_state_at(60_000_000.0);
    assert_eq!(late.index, FrameIndex(24));
    assert!(late.active.is_empty());
}

#[test]
fn renders_frames_and_manifest_into_a_directory() {
    let s = RenderSession::from_pattern(&pattern(), small_config()).unwrap();
    let dir = fresh_dir("frames_into");
    let r = s.rasterizer().unwrap();
    let (manifest, stats) = s
        .render_frames_into(&dir, &r, &RenderThreading::default())
        .unwrap();

    assert_eq!(manifest.len(), 25);
    assert_eq!(stats.frames_total, 25);
    assert_eq!(stats.frames_rendered as usize, manifest.distinct_count());
    assert!(manifest.frames().iter().all(|p| p.is_absolute() && p.is_file()));

    let text = std::fs::read_to_string(dir.join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(text.lines().count(), 25);
    assert!(text.starts_with("file '"));
}

#[test]
fn still_frame_has_configured_size() {
    let s = RenderSession::from_pattern(&pattern(), small_config()).unwrap();
    let frame = s.render_still(100_000.0, &s.rasterizer().unwrap()).unwrap();
    assert_eq!((frame.width, frame.height), (160, 40));
}

#[test]
fn prepare_reads_and_repairs_files() {
    let dir = fresh_dir("prepare");
    let mut bytes = midi_file_bytes();
    // Corrupt the first track length; the repair pass restores it.
    bytes[18..22].copy_from_slice(&0u32.to_be_bytes());
    let path = dir.join("song.mid");
    std::fs::write(&path, &bytes).unwrap();

    let mut cfg = small_config();
    cfg.preprocess.fix_track_length = true;
    let s = RenderSession::prepare(&path, cfg).unwrap();
    assert_eq!(s.timeline().len(), 2);
    assert_eq!(s.temp_dir_name(), "temp-song.mid");

    let copy = s.midi_file_for_audio(&dir).unwrap();
    assert_eq!(copy, dir.join("input.mid"));
    assert_eq!(std::fs::read(copy).unwrap(), midi_file_bytes());
}

#[test]
fn prepare_rejects_missing_files() {
    let err = RenderSession::prepare(Path::new("target/unit_session/none.mid"), small_config())
        .unwrap_err();
    assert!(matches!(err, PianoError::Config(_)));
}

#[test]
fn pattern_sessions_cannot_synthesize_audio() {
    let s = RenderSession::from_pattern(&pattern(), small_config()).unwrap();
    assert_eq!(s.temp_dir_name(), "temp-pattern");
    assert!(s.midi_file_for_audio(Path::new("target")).is_err());
}

#[test]
fn invalid_config_is_rejected_before_loading() {
    let mut cfg = small_config();
    cfg.video.width = 161;
    assert!(RenderSession::from_pattern(&pattern(), cfg).is_err());
}

#[cfg(unix)]
#[test]
fn audio_without_a_midi_file_fails_before_rendering() {
    let dir = fresh_dir("audio_needs_file");
    let sound_font = dir.join("piano.sf2");
    std::fs::write(&sound_font, b"sf2").unwrap();
    let mut cfg = small_config();
    cfg.video.add_audio = true;
    cfg.video.sound_font = Some(sound_font);
    let s = RenderSession::from_pattern(&pattern(), cfg).unwrap();

    let opts = RenderSessionOpts {
        work_dir: dir.clone(),
        // `true -version` exits 0, which is all the ffmpeg check needs.
        ffmpeg: PathBuf::from("true"),
        ..Default::default()
    };
    let err = s.render_to_mp4(&dir.join("out.mp4"), &opts).unwrap_err();
    assert!(matches!(err, PianoError::Config(_)), "{err}");
    assert!(!dir.join(s.temp_dir_name()).exists());
}
