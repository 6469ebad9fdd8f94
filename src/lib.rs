//! pianoreel renders an animated piano keyboard that lights up keys as a MIDI file plays.
//!
//! # Pipeline overview
//!
//! 1. **Load**: MIDI file -> [`MidiPattern`] (`midly`, optional track-length repair)
//! 2. **Timeline**: tick deltas -> globally ordered [`Timeline`] of absolute-time note events
//! 3. **Layout**: key range + output size -> [`KeyboardLayout`] (outlines, offsets, scale)
//! 4. **Sequence**: [`FrameSequencer`] walks the timeline frame by frame through per-note fades
//! 5. **Render**: each frame's active notes are rasterized once per distinct state
//!    ([`FrameCache`], [`CpuRasterizer`]) and listed in a concat [`FrameManifest`]
//! 6. **Assemble**: the system `ffmpeg` encodes the manifest, optionally muxed with audio
//!    synthesized by `fluidsynth`
//!
//! [`RenderSession`] runs all of it for one file. Nothing is kept in process-wide state.
#![forbid(unsafe_code)]

pub mod config;
pub mod encode;
pub mod foundation;
pub mod frames;
pub mod keyboard;
pub mod midi;
pub mod render;
pub mod session;
pub mod timeline;

pub use config::{Config, PianoConfig, PreprocessConfig, VideoConfig};
pub use encode::ffmpeg::{
    FFMPEG_VERSION_FLAG, FLUIDSYNTH_VERSION_FLAG, VideoAssembler, ensure_parent_dir,
    is_tool_on_path, run_tool,
};
pub use encode::manifest::FrameManifest;
pub use foundation::color::Rgb8;
pub use foundation::core::{Canvas, Fps, FrameIndex};
pub use foundation::error::{PianoError, PianoResult};
pub use frames::fade::{FadePalette, FadePhase, FadeProfile, FadeTable};
pub use frames::sequencer::{ActiveNotes, FrameSequencer, FrameState, total_frames};
pub use keyboard::geometry::{KeyDimensions, KeySpec, KeyboardLayout, OutlineShape};
pub use keyboard::pitch::{PitchClass, count_white_keys, is_white_key, note_name};
pub use keyboard::range::{KeyBound, KeyRange};
pub use midi::load::{load_pattern, parse_pattern, repair_track_length};
pub use midi::pattern::{MidiPattern, TrackEvent, TrackEventKind};
pub use render::backend::{FrameRGBA, FrameRasterizer, KeyColors};
pub use render::cache::{
    CacheStats, CachedFrame, FrameCache, FrameCacheKey, SILENCE_KEY, StoredFrame,
};
pub use render::cpu::CpuRasterizer;
pub use render::pipeline::{RenderStats, RenderThreading, render_frames};
pub use session::{RenderReport, RenderSession, RenderSessionOpts};
pub use timeline::builder::{
    DEFAULT_TEMPO_MICROS_PER_QUARTER, NoteEvent, NoteFilter, NoteKind, Timeline, TimelineBuilder,
    build_timeline,
};
