/// Convenience result type used across pianoreel.
pub type PianoResult<T> = Result<T, PianoError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Every variant is fatal for a run: nothing is retried and no frame is skipped.
#[derive(thiserror::Error, Debug)]
pub enum PianoError {
    /// Invalid configuration, missing input file or a collapsed key range.
    #[error("config error: {0}")]
    Config(String),

    /// Missing or zero tick resolution, or MIDI data that cannot be parsed.
    #[error("midi format error: {0}")]
    MidiFormat(String),

    /// The rasterizer or image encoder failed for a frame.
    #[error("render error: {0}")]
    Render(String),

    /// An external binary (`ffmpeg`, `fluidsynth`) exited unsuccessfully.
    #[error("{tool} failed ({status}) while trying to {description}:\n{output}")]
    ExternalTool {
        /// Binary name as invoked.
        tool: String,
        /// What the invocation was supposed to do.
        description: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Captured stdout and stderr, verbatim.
        output: String,
    },

    /// A required external binary could not be started.
    #[error("{tool} is required to {purpose}, but '{program}' could not be run (is it installed and on PATH?)")]
    ToolMissing {
        tool: String,
        /// Program path or name as configured.
        program: String,
        purpose: String,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PianoError {
    /// Build a [`PianoError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`PianoError::MidiFormat`] value.
    pub fn midi_format(msg: impl Into<String>) -> Self {
        Self::MidiFormat(msg.into())
    }

    /// Build a [`PianoError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`PianoError::ToolMissing`] value.
    pub fn tool_missing(
        tool: impl Into<String>,
        program: &std::ffi::OsStr,
        purpose: impl Into<String>,
    ) -> Self {
        Self::ToolMissing {
            tool: tool.into(),
            program: program.to_string_lossy().into_owned(),
            purpose: purpose.into(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
