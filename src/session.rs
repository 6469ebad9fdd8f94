use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;

use crate::config::Config;
use crate::encode::ffmpeg::{
    FFMPEG_VERSION_FLAG, FLUIDSYNTH_VERSION_FLAG, VideoAssembler, ensure_parent_dir,
    is_tool_on_path,
};
use crate::encode::manifest::FrameManifest;
use crate::foundation::core::{FrameIndex, Fps};
use crate::foundation::error::{PianoError, PianoResult};
use crate::frames::fade::FadePalette;
use crate::frames::sequencer::{ActiveNotes, FrameSequencer, FrameState};
use crate::keyboard::geometry::KeyboardLayout;
use crate::keyboard::range::KeyRange;
use crate::midi::load::{parse_pattern, repair_track_length};
use crate::midi::pattern::MidiPattern;
use crate::render::backend::{FrameRGBA, FrameRasterizer, KeyColors};
use crate::render::cache::FrameCache;
use crate::render::cpu::CpuRasterizer;
use crate::render::pipeline::{RenderStats, RenderThreading, render_frames};
use crate::timeline::builder::{NoteFilter, Timeline, build_timeline};

pub const MANIFEST_FILE_NAME: &str = "frames.txt";
pub const FRAMES_DIR_NAME: &str = "frames";

/// Where the MIDI data of a session came from.
#[derive(Clone, Debug)]
struct MidiSource {
    path: Option<PathBuf>,
    /// File bytes after preprocessing; empty when built from a parsed pattern.
    bytes: Vec<u8>,
    repaired: bool,
}

/// One run: a timeline, the keyboard it is drawn on and the colors it fades through.
///
/// Everything is built up front and read-only afterwards; nothing is shared between sessions.
#[derive(Clone, Debug)]
pub struct RenderSession {
    source: MidiSource,
    config: Config,
    fps: Fps,
    timeline: Timeline,
    layout: Arc<KeyboardLayout>,
    palette: FadePalette,
    colors: KeyColors,
}

#[derive(Clone, Debug)]
pub struct RenderSessionOpts {
    /// Parent of the `temp-<midi file name>` directory.
    pub work_dir: PathBuf,
    pub keep_temp: bool,
    pub threading: RenderThreading,
    pub ffmpeg: PathBuf,
    pub fluidsynth: PathBuf,
}

impl Default for RenderSessionOpts {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            keep_temp: false,
            threading: RenderThreading::default(),
            ffmpeg: PathBuf::from("ffmpeg"),
            fluidsynth: PathBuf::from("fluidsynth"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderReport {
    pub output: PathBuf,
    pub stats: RenderStats,
    pub with_audio: bool,
    /// Set when the temp directory was kept.
    pub temp_dir: Option<PathBuf>,
}

impl RenderSession {
    /// Load `midi_path` and build everything a render needs.
    #[tracing::instrument(skip(config))]
    pub fn prepare(midi_path: &Path, config: Config) -> PianoResult<Self> {
        config.validate()?;
        if !midi_path.is_file() {
            return Err(PianoError::config(format!(
                "midi file '{}' does not exist",
                midi_path.display()
            )));
        }

        let mut bytes = std::fs::read(midi_path)
            .with_context(|| format!("failed to read midi file '{}'", midi_path.display()))?;
        let repaired = config.preprocess.fix_track_length;
        if repaired {
            repair_track_length(&mut bytes)?;
        }
        let pattern = parse_pattern(&bytes).map_err(|e| match e {
            PianoError::MidiFormat(msg) => {
                PianoError::midi_format(format!("'{}': {msg}", midi_path.display()))
            }
            other => other,
        })?;

        let mut session = Self::from_pattern(&pattern, config)?;
        session.source = MidiSource {
            path: Some(midi_path.to_path_buf()),
            bytes,
            repaired,
        };
        Ok(session)
    }

    /// Build a session from an already parsed pattern. Audio needs a file and is unavailable.
    pub fn from_pattern(pattern: &MidiPattern, config: Config) -> PianoResult<Self> {
        config.validate()?;
        let fps = config.fps()?;

        let piano = &config.piano;
        // Filter on the white-aligned bounds the keyboard is drawn with.
        let filter = NoteFilter::between(piano.key_from.white_floor(), piano.key_to.white_ceil());
        let timeline = build_timeline(pattern, filter)?;
        let range = KeyRange::resolve(piano.key_from, piano.key_to, timeline.note_span())?;
        let timeline = timeline.restrict_to(range);

        let layout = KeyboardLayout::compute(range, config.video.width, config.video.height)?;
        let palette = FadePalette::new(config.highlight(), &config.fade_profile());
        let colors = config.key_colors();

        tracing::info!(
            range = %range,
            events = timeline.len(),
            frames = timeline.total_frames(fps),
            "session prepared"
        );

        Ok(Self {
            source: MidiSource {
                path: None,
                bytes: Vec::new(),
                repaired: false,
            },
            config,
            fps,
            timeline,
            layout: Arc::new(layout),
            palette,
            colors,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    pub fn range(&self) -> KeyRange {
        self.layout.range()
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn palette(&self) -> &FadePalette {
        &self.palette
    }

    pub fn total_frames(&self) -> u64 {
        self.timeline.total_frames(self.fps)
    }

    pub fn sequencer(&self) -> FrameSequencer<'_> {
        FrameSequencer::new(&self.timeline, &self.palette, self.fps)
    }

    pub fn rasterizer(&self) -> PianoResult<CpuRasterizer> {
        CpuRasterizer::new(Arc::clone(&self.layout), self.colors)
    }

    /// Name of the per-run temp directory, `temp-<midi file name>`.
    pub fn temp_dir_name(&self) -> String {
        let name = self
            .source
            .path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pattern".to_owned());
        format!("temp-{name}")
    }

    /// State of the frame showing `at_micros`, clamped to the last frame.
    pub fn frame_state_at(&self, at_micros: f64) -> FrameState {
        let wanted = (at_micros.max(0.0) / self.fps.frame_duration_micros()).floor() as u64;
        let index = wanted.min(self.total_frames().saturating_sub(1));
        self.sequencer()
            .nth(usize::try_from(index).unwrap_or(usize::MAX))
            .unwrap_or(FrameState {
                index: FrameIndex(index),
                active: ActiveNotes::new(),
            })
    }

    pub fn render_still(
        &self,
        at_micros: f64,
        rasterizer: &dyn FrameRasterizer,
    ) -> PianoResult<FrameRGBA> {
        rasterizer.rasterize(&self.frame_state_at(at_micros).active)
    }

    /// Resolve every frame into `dir/frames/` and write `dir/frames.txt`.
    pub fn render_frames_into(
        &self,
        dir: &Path,
        rasterizer: &dyn FrameRasterizer,
        threading: &RenderThreading,
    ) -> PianoResult<(FrameManifest, RenderStats)> {
        let dir = std::path::absolute(dir)
            .with_context(|| format!("resolve directory '{}'", dir.display()))?;
        let cache = FrameCache::new(dir.join(FRAMES_DIR_NAME))?;
        let (manifest, stats) = render_frames(self.sequencer(), &cache, rasterizer, threading)?;
        manifest.write(&dir.join(MANIFEST_FILE_NAME))?;
        Ok((manifest, stats))
    }

    /// Render the whole piece to `out`, adding synthesized audio when configured.
    #[tracing::instrument(skip_all, fields(out = %out.display()))]
    pub fn render_to_mp4(&self, out: &Path, opts: &RenderSessionOpts) -> PianoResult<RenderReport> {
        let started = Instant::now();
        self.check_tools(opts)?;
        let temp_dir = std::path::absolute(opts.work_dir.join(self.temp_dir_name()))
            .context("resolve temp directory")?;
        if temp_dir.exists() {
            std::fs::remove_dir_all(&temp_dir).with_context(|| {
                format!("clear stale temp directory '{}'", temp_dir.display())
            })?;
        }
        std::fs::create_dir_all(&temp_dir)
            .with_context(|| format!("create temp directory '{}'", temp_dir.display()))?;
        let mut guard = TempDirGuard(Some(temp_dir.clone()));

        let rasterizer = self.rasterizer()?;
        let (_, stats) = self.render_frames_into(&temp_dir, &rasterizer, &opts.threading)?;

        let assembler = VideoAssembler::new(self.fps.num)
            .with_ffmpeg(&opts.ffmpeg)
            .with_fluidsynth(&opts.fluidsynth);
        let video = temp_dir.join("video.mp4");
        assembler.concat_frames(&temp_dir.join(MANIFEST_FILE_NAME), &video)?;

        let with_audio = self.config.video.add_audio;
        if with_audio {
            let sound_font = self.config.video.sound_font.as_deref().ok_or_else(|| {
                PianoError::config("video addAudio is set but no soundFont is configured")
            })?;
            let midi = self.midi_file_for_audio(&temp_dir)?;
            let wav = temp_dir.join("audio.wav");
            let mp3 = temp_dir.join("audio.mp3");
            assembler.synthesize_audio(sound_font, &midi, &wav)?;
            assembler.transcode_audio(&wav, &mp3)?;
            assembler.mux(&video, &mp3, out)?;
        } else {
            move_file(&video, out)?;
        }

        let kept = if opts.keep_temp {
            guard.keep()
        } else {
            None
        };
        tracing::info!(
            frames = stats.frames_total,
            rendered = stats.frames_rendered,
            with_audio,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "video written"
        );
        Ok(RenderReport {
            output: out.to_path_buf(),
            stats,
            with_audio,
            temp_dir: kept,
        })
    }

    /// Fail before any frame is rendered when a step of the run could not be executed.
    fn check_tools(&self, opts: &RenderSessionOpts) -> PianoResult<()> {
        if !is_tool_on_path(opts.ffmpeg.as_os_str(), FFMPEG_VERSION_FLAG) {
            return Err(PianoError::tool_missing(
                "ffmpeg",
                opts.ffmpeg.as_os_str(),
                "encode the MP4",
            ));
        }
        if !self.config.video.add_audio {
            return Ok(());
        }
        if self.source.path.is_none() {
            return Err(PianoError::config(
                "audio synthesis needs a midi file; this session was built from a parsed pattern",
            ));
        }
        if !is_tool_on_path(opts.fluidsynth.as_os_str(), FLUIDSYNTH_VERSION_FLAG) {
            return Err(PianoError::tool_missing(
                "fluidsynth",
                opts.fluidsynth.as_os_str(),
                "synthesize audio",
            ));
        }
        Ok(())
    }

    /// The synthesizer reads a file: the original one, or a copy of the repaired bytes.
    fn midi_file_for_audio(&self, temp_dir: &Path) -> PianoResult<PathBuf> {
        match &self.source.path {
            Some(path) if !self.source.repaired => Ok(path.clone()),
            Some(_) => {
                let copy = temp_dir.join("input.mid");
                std::fs::write(&copy, &self.source.bytes)
                    .with_context(|| format!("write repaired midi '{}'", copy.display()))?;
                Ok(copy)
            }
            None => Err(PianoError::config(
                "audio synthesis needs a midi file; this session was built from a parsed pattern",
            )),
        }
    }
}

fn move_file(from: &Path, to: &Path) -> PianoResult<()> {
    ensure_parent_dir(to)?;
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Rename fails across filesystems.
    std::fs::copy(from, to)
        .with_context(|| format!("copy '{}' to '{}'", from.display(), to.display()))?;
    Ok(())
}

/// Removes the run's temp directory on drop unless [`TempDirGuard::keep`] was called.
struct TempDirGuard(Option<PathBuf>);

impl TempDirGuard {
    fn keep(&mut self) -> Option<PathBuf> {
        self.0.take()
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_dir_all(path);
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
