use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;

use crate::foundation::error::{PianoError, PianoResult};

/// Flag that makes `ffmpeg` print its version and exit.
pub const FFMPEG_VERSION_FLAG: &str = "-version";
/// Flag that makes `fluidsynth` print its version and exit.
pub const FLUIDSYNTH_VERSION_FLAG: &str = "--version";

/// True when `program version_flag` runs and exits successfully.
pub fn is_tool_on_path(program: &OsStr, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> PianoResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Run `program` to completion, capturing stdout and stderr.
///
/// A non-zero exit becomes [`PianoError::ExternalTool`] carrying the captured output.
pub fn run_tool(
    program: &OsStr,
    args: &[OsString],
    tool: &str,
    description: &str,
) -> PianoResult<()> {
    tracing::debug!(
        tool,
        command = %format_command_line(program, args),
        "running external tool"
    );
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            tracing::debug!(tool, error = %e, "spawn failed");
            PianoError::tool_missing(tool, program, description)
        })?;

    if output.status.success() {
        return Ok(());
    }

    let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
    captured.push_str(&String::from_utf8_lossy(&output.stderr));
    Err(PianoError::ExternalTool {
        tool: tool.to_owned(),
        description: description.to_owned(),
        status: output.status.to_string(),
        output: captured,
    })
}

fn format_command_line(program: &OsStr, args: &[OsString]) -> String {
    let mut line = program.to_string_lossy().into_owned();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Drives `ffmpeg` and `fluidsynth` to turn a frame manifest (and the MIDI file) into a video.
#[derive(Clone, Debug)]
pub struct VideoAssembler {
    fps: u32,
    ffmpeg: PathBuf,
    fluidsynth: PathBuf,
}

impl VideoAssembler {
    pub fn new(fps: u32) -> Self {
        Self {
            fps,
            ffmpeg: PathBuf::from("ffmpeg"),
            fluidsynth: PathBuf::from("fluidsynth"),
        }
    }

    pub fn with_ffmpeg(mut self, program: impl Into<PathBuf>) -> Self {
        self.ffmpeg = program.into();
        self
    }

    pub fn with_fluidsynth(mut self, program: impl Into<PathBuf>) -> Self {
        self.fluidsynth = program.into();
        self
    }

    pub fn concat_args(&self, manifest: &Path, out: &Path) -> Vec<OsString> {
        let fps = self.fps.to_string();
        let mut args: Vec<OsString> = ["-y", "-f", "concat", "-r", fps.as_str(), "-safe", "0", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(manifest.into());
        args.extend(
            ["-pix_fmt", "yuv420p", "-framerate", fps.as_str()]
                .iter()
                .map(OsString::from),
        );
        args.push(out.into());
        args
    }

    pub fn synthesize_args(&self, sound_font: &Path, midi: &Path, wav: &Path) -> Vec<OsString> {
        vec!["-F".into(), wav.into(), sound_font.into(), midi.into()]
    }

    pub fn transcode_args(&self, wav: &Path, mp3: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), wav.into()];
        args.extend(
            ["-vn", "-ar", "44100", "-ac", "2", "-b:a", "192k"]
                .iter()
                .map(OsString::from),
        );
        args.push(mp3.into());
        args
    }

    pub fn mux_args(&self, video: &Path, audio: &Path, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            video.into(),
            "-i".into(),
            audio.into(),
        ];
        args.extend(
            ["-c", "copy", "-map", "0:v:0", "-map", "1:a:0", "-shortest"]
                .iter()
                .map(OsString::from),
        );
        args.push(out.into());
        args
    }

    /// Encode the frames listed in `manifest` into `out` (H.264, yuv420p).
    #[tracing::instrument(skip(self))]
    pub fn concat_frames(&self, manifest: &Path, out: &Path) -> PianoResult<()> {
        ensure_parent_dir(out)?;
        run_tool(
            self.ffmpeg.as_os_str(),
            &self.concat_args(manifest, out),
            "ffmpeg",
            "encode the frame sequence",
        )
    }

    /// Render `midi` to a WAV file with `sound_font`.
    #[tracing::instrument(skip(self))]
    pub fn synthesize_audio(&self, sound_font: &Path, midi: &Path, wav: &Path) -> PianoResult<()> {
        run_tool(
            self.fluidsynth.as_os_str(),
            &self.synthesize_args(sound_font, midi, wav),
            "fluidsynth",
            "synthesize audio",
        )
    }

    pub fn transcode_audio(&self, wav: &Path, mp3: &Path) -> PianoResult<()> {
        run_tool(
            self.ffmpeg.as_os_str(),
            &self.transcode_args(wav, mp3),
            "ffmpeg",
            "transcode audio to mp3",
        )
    }

    /// Copy the video stream and the audio stream into `out`, cut to the shorter one.
    pub fn mux(&self, video: &Path, audio: &Path, out: &Path) -> PianoResult<()> {
        ensure_parent_dir(out)?;
        run_tool(
            self.ffmpeg.as_os_str(),
            &self.mux_args(video, audio, out),
            "ffmpeg",
            "mux audio and video",
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
