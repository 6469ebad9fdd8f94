use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::foundation::color::Rgb8;
use crate::foundation::core::Fps;
use crate::frames::fade::{FadePalette, FadeProfile};
use crate::frames::sequencer::ActiveNotes;
use crate::midi::pattern::{MidiPattern, TrackEvent};
use crate::render::backend::FrameRGBA;
use crate::timeline::builder::{NoteFilter, Timeline, build_timeline};

struct CountingRasterizer(AtomicUsize);

impl FrameRasterizer for CountingRasterizer {
    fn rasterize(&self, active: &ActiveNotes) -> PianoResult<FrameRGBA> {
        self.0.fetch_add(1, Ordering::SeqCst);
        let mut data = vec![0u8; 16];
        for (i, (note, c)) in active.iter().take(4).enumerate() {
            data[i * 4..i * 4 + 4].copy_from_slice(&[*note, c.r, c.g, c.b]);
        }
        Ok(FrameRGBA {
            width: 2,
            height: 2,
            data,
        })
    }

    fn size(&self) -> (u32, u32) {
        (2, 2)
    }
}

fn fresh_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_render_pipeline").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// Two short notes in a two second piece at 25 fps (one tick per millisecond).
fn timeline() -> Timeline {
    let pattern = MidiPattern {
        ticks_per_beat: Some(500),
        tracks: vec![vec![
            TrackEvent::note_on(0, 60, 90),
            TrackEvent::note_off(200, 60),
            TrackEvent::note_on(300, 61, 90),
            TrackEvent::note_off(200, 61),
            TrackEvent::note_on(1300, 62, 0),
        ]],
    };
    build_timeline(&pattern, NoteFilter::unbounded()).unwrap()
}

fn palette() -> FadePalette {
    FadePalette::new(Rgb8::new(0xde, 0x44, 0x39), &FadeProfile::default())
}

fn fps() -> Fps {
    Fps::integer(25).unwrap()
}

#[test]
fn sequential_render_dedupes_repeated_states() {
    let t = timeline();
    let p = palette();
    let cache = FrameCache::new(fresh_dir("sequential")).unwrap();
    let r = CountingRasterizer(AtomicUsize::new(0));

    let (manifest, stats) = render_frames(
        FrameSequencer::new(&t, &p, fps()),
        &cache,
        &r,
        &RenderThreading::default(),
    )
    .unwrap();

    assert_eq!(manifest.len(), 50);
    assert_eq!(stats.frames_total, 50);
    assert_eq!(stats.frames_rendered as usize, r.0.load(Ordering::SeqCst));
    assert_eq!(stats.frames_rendered as usize, manifest.distinct_count());
    assert_eq!(stats.frames_rendered + stats.frames_reused, 50);
    // The tail of the piece is silence, rendered once.
    assert!(stats.frames_reused > 20);
    assert_eq!(manifest.frames()[49], manifest.frames()[48]);
}

#[test]
fn parallel_render_matches_sequential_order() {
    let t = timeline();
    let p = palette();

    let seq_cache = FrameCache::new(fresh_dir("order_seq")).unwrap();
    let par_cache = FrameCache::new(fresh_dir("order_par")).unwrap();
    let r = CountingRasterizer(AtomicUsize::new(0));

    let (seq, _) = render_frames(
        FrameSequencer::new(&t, &p, fps()),
        &seq_cache,
        &r,
        &RenderThreading::default(),
    )
    .unwrap();
    let (par, par_stats) = render_frames(
        FrameSequencer::new(&t, &p, fps()),
        &par_cache,
        &r,
        &RenderThreading {
            parallel: true,
            threads: Some(2),
        },
    )
    .unwrap();

    let names = |m: &FrameManifest| -> Vec<std::ffi::OsString> {
        m.frames()
            .iter()
            .map(|f| f.file_name().unwrap().to_owned())
            .collect()
    };
    assert_eq!(names(&seq), names(&par));
    assert_eq!(par_stats.frames_rendered as usize, par.distinct_count());
}

#[test]
fn second_run_reuses_every_frame() {
    let t = timeline();
    let p = palette();
    let cache = FrameCache::new(fresh_dir("rerun")).unwrap();
    let r = CountingRasterizer(AtomicUsize::new(0));

    let threading = RenderThreading::default();
    render_frames(FrameSequencer::new(&t, &p, fps()), &cache, &r, &threading).unwrap();
    let calls = r.0.load(Ordering::SeqCst);
    let (_, stats) =
        render_frames(FrameSequencer::new(&t, &p, fps()), &cache, &r, &threading).unwrap();
    assert_eq!(stats.frames_rendered, 0);
    assert_eq!(stats.frames_reused, 50);
    assert_eq!(r.0.load(Ordering::SeqCst), calls);
}

#[test]
fn zero_threads_is_rejected() {
    assert!(build_thread_pool(Some(0)).is_err());
    assert!(build_thread_pool(Some(1)).is_ok());
}
