use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::PianoResult;

/// Ordered frame list for the ffmpeg concat demuxer, one entry per output frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameManifest {
    frames: Vec<PathBuf>,
}

impl FrameManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            frames: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.frames.push(path.into());
    }

    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn distinct_count(&self) -> usize {
        self.frames.iter().collect::<HashSet<_>>().len()
    }

    /// Render as concat-demuxer text: `file '<path>'` per line.
    pub fn to_concat_list(&self) -> String {
        let mut out = String::with_capacity(self.frames.len() * 64);
        for path in &self.frames {
            out.push_str("file '");
            out.push_str(&quote_concat_path(path));
            out.push_str("'\n");
        }
        out
    }

    pub fn write(&self, path: &Path) -> PianoResult<()> {
        std::fs::write(path, self.to_concat_list())
            .with_context(|| format!("write frame manifest '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), frames = self.len(), "manifest written");
        Ok(())
    }
}

/// Escape a path for a single-quoted concat entry.
fn quote_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}
