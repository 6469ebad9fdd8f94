use super::*;
use crate::frames::fade::{FadePhase, FadeProfile};
use crate::midi::pattern::{MidiPattern, TrackEvent};
use crate::timeline::builder::{NoteFilter, build_timeline};

const HIGHLIGHT: Rgb8 = Rgb8::new(0xde, 0x44, 0x39);

fn fps25() -> Fps {
    Fps::integer(25).unwrap()
}

/// 500 ticks per beat at 120 BPM: one tick per millisecond, 40 ticks per frame.
/// Note 100 at 1 s only stretches the duration and is filtered out.
fn timeline(events: Vec<TrackEvent>) -> Timeline {
    let mut track = vec![TrackEvent::tempo(0, 500_000)];
    track.extend(events);
    let pattern = MidiPattern {
        ticks_per_beat: Some(500),
        tracks: vec![track, vec![TrackEvent::note_on(1000, 100, 90)]],
    };
    build_timeline(&pattern, NoteFilter::between(Some(21), Some(99))).unwrap()
}

fn frames(t: &Timeline, palette: &FadePalette) -> Vec<FrameState> {
    FrameSequencer::new(t, palette, fps25()).collect()
}

#[test]
fn held_note_passes_through_fade_in_then_stays_highlighted() {
    let t = timeline(vec![TrackEvent::note_on(0, 60, 90)]);
    let palette = FadePalette::new(HIGHLIGHT, &FadeProfile::default());
    let out = frames(&t, &palette);
    assert_eq!(out.len(), 25);

    for (k, frame) in out.iter().take(4).enumerate() {
        let expected = palette.color_for(FadePhase::FadingIn(k + 1), true);
        assert_eq!(frame.active.get(&60).copied(), expected, "frame {k}");
        assert_ne!(frame.active[&60], HIGHLIGHT);
    }
    for frame in &out[4..] {
        assert_eq!(frame.active[&60], HIGHLIGHT);
    }
}

#[test]
fn release_one_frame_later_fades_out_then_leaves() {
    let t = timeline(vec![
        TrackEvent::note_on(0, 60, 90),
        TrackEvent::note_off(60, 60),
        TrackEvent::note_on(0, 61, 90),
        TrackEvent::note_off(0, 61),
    ]);
    let palette = FadePalette::new(HIGHLIGHT, &FadeProfile::default());
    let out = frames(&t, &palette);

    assert_eq!(
        out[0].active.get(&60).copied(),
        palette.color_for(FadePhase::FadingIn(1), true)
    );
    for k in 1..=9 {
        let white = out[k].active[&60];
        assert_eq!(
            Some(white),
            palette.color_for(FadePhase::FadingOut(k), true)
        );
        assert!(white.lightness() > HIGHLIGHT.lightness());
    }
    assert!(!out[10].active.contains_key(&60));

    // C#4 is pressed and released in the same window: it still fades out, darker.
    for k in 1..=9 {
        let black = out[k].active[&61];
        assert!(black.lightness() < HIGHLIGHT.lightness());
    }
    assert!(!out[10].active.contains_key(&61));
}

#[test]
fn zero_velocity_note_on_matches_note_off() {
    let palette = FadePalette::new(HIGHLIGHT, &FadeProfile::default());
    let a = timeline(vec![
        TrackEvent::note_on(0, 60, 90),
        TrackEvent::note_off(100, 60),
    ]);
    let b = timeline(vec![
        TrackEvent::note_on(0, 60, 90),
        TrackEvent::note_on(100, 60, 0),
    ]);
    assert_eq!(frames(&a, &palette), frames(&b, &palette));
}

#[test]
fn disabled_fades_switch_instantly() {
    let palette = FadePalette::new(HIGHLIGHT, &FadeProfile::disabled());
    let t = timeline(vec![
        TrackEvent::note_on(0, 60, 90),
        TrackEvent::note_off(60, 60),
    ]);
    let out = frames(&t, &palette);
    assert_eq!(out[0].active[&60], HIGHLIGHT);
    assert!(out[1].active.is_empty());
}

#[test]
fn frame_count_is_ceiling_of_duration() {
    let palette = FadePalette::new(HIGHLIGHT, &FadeProfile::default());
    // The last event sits exactly on a frame boundary and adds no frame.
    let t = timeline(vec![TrackEvent::note_on(0, 60, 90)]);
    assert_eq!(t.duration_micros(), 1_000_000.0);
    let seq = FrameSequencer::new(&t, &palette, fps25());
    assert_eq!(seq.total_frames(), 25);
    assert_eq!(seq.size_hint(), (25, Some(25)));
    assert_eq!(total_frames(1_000_001.0, fps25()), 26);
    assert_eq!(total_frames(0.0, fps25()), 0);
}

#[test]
fn frame_indices_are_sequential() {
    let palette = FadePalette::new(HIGHLIGHT, &FadeProfile::default());
    let t = timeline(vec![]);
    let out = frames(&t, &palette);
    assert!(out.iter().enumerate().all(|(i, f)| f.index == FrameIndex(i as u64)));
    assert!(out.iter().all(|f| f.active.is_empty()));
}
