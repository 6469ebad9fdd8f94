use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::color::Rgb8;
use crate::foundation::core::Fps;
use crate::foundation::error::{PianoError, PianoResult};
use crate::frames::fade::{DEFAULT_FADE_IN, DEFAULT_FADE_OUT, FadeProfile};
use crate::keyboard::range::KeyBound;
use crate::render::backend::KeyColors;

/// Everything a run can be configured with. Missing keys take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub piano: PianoConfig,
    pub video: VideoConfig,
    pub preprocess: PreprocessConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PianoConfig {
    #[serde(alias = "startNote", serialize_with = "serialize_bound")]
    pub key_from: KeyBound,
    #[serde(alias = "endNote", serialize_with = "serialize_bound")]
    pub key_to: KeyBound,
    pub color_white_keys: Rgb8,
    pub color_black_keys: Rgb8,
    pub color_highlight: Rgb8,
    pub outline_color_white_keys: Rgb8,
    pub outline_color_black_keys: Rgb8,
    pub outline_color_highlight: Rgb8,
}

impl Default for PianoConfig {
    fn default() -> Self {
        let colors = KeyColors::default();
        Self {
            key_from: KeyBound::Auto,
            key_to: KeyBound::Auto,
            color_white_keys: colors.white_fill,
            color_black_keys: colors.black_fill,
            color_highlight: Rgb8::new(0xde, 0x44, 0x39),
            outline_color_white_keys: colors.white_outline,
            outline_color_black_keys: colors.black_outline,
            outline_color_highlight: colors.highlight_outline,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub add_audio: bool,
    pub sound_font: Option<PathBuf>,
    pub note_fade_in: bool,
    pub note_fade_out: bool,
    pub fade_in_steps: Vec<f64>,
    pub fade_out_steps: Vec<f64>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 100,
            frame_rate: 25,
            add_audio: false,
            sound_font: None,
            note_fade_in: true,
            note_fade_out: true,
            fade_in_steps: DEFAULT_FADE_IN.to_vec(),
            fade_out_steps: DEFAULT_FADE_OUT.to_vec(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct PreprocessConfig {
    /// Rewrite the first track's length header from the file size before parsing.
    pub fix_track_length: bool,
}

fn serialize_bound<S: serde::Serializer>(bound: &KeyBound, s: S) -> Result<S::Ok, S::Error> {
    match bound {
        KeyBound::Auto => s.serialize_str("auto"),
        KeyBound::Note(n) => s.serialize_u8(*n),
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> PianoResult<Self> {
        toml::from_str(s).map_err(|e| PianoError::config(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> PianoResult<Self> {
        Self::load_layered(&[path])
    }

    /// Merge the TOML files in order, later files overriding earlier keys, then deserialize.
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> PianoResult<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                return Err(PianoError::config(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read config '{}'", path.display()))?;
            let table: toml::Table = text.parse().map_err(|e| {
                PianoError::config(format!("invalid config '{}': {e}", path.display()))
            })?;
            merge_tables(&mut merged, table);
            tracing::debug!(path = %path.display(), "config layer loaded");
        }
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| PianoError::config(format!("invalid config: {e}")))
    }

    pub fn validate(&self) -> PianoResult<()> {
        let v = &self.video;
        if v.width == 0 || v.height == 0 {
            return Err(PianoError::config(format!(
                "video width/height must be non-zero, got {}x{}",
                v.width, v.height
            )));
        }
        if !v.width.is_multiple_of(2) || !v.height.is_multiple_of(2) {
            return Err(PianoError::config(format!(
                "video width/height must be even (required for yuv420p mp4 output), got {}x{}",
                v.width, v.height
            )));
        }
        if v.width > u32::from(u16::MAX) || v.height > u32::from(u16::MAX) {
            return Err(PianoError::config(format!(
                "video width/height must be at most {}, got {}x{}",
                u16::MAX,
                v.width,
                v.height
            )));
        }
        if v.frame_rate == 0 {
            return Err(PianoError::config("video frameRate must be non-zero"));
        }
        if v.add_audio {
            match &v.sound_font {
                None => {
                    return Err(PianoError::config(
                        "video addAudio is set but no soundFont is configured",
                    ));
                }
                Some(sf) if !sf.is_file() => {
                    return Err(PianoError::config(format!(
                        "sound font '{}' does not exist",
                        sf.display()
                    )));
                }
                Some(_) => {}
            }
        }
        if let Some(bad) = v
            .fade_in_steps
            .iter()
            .chain(&v.fade_out_steps)
            .find(|a| !a.is_finite())
        {
            return Err(PianoError::config(format!(
                "fade step amounts must be finite, got {bad}"
            )));
        }
        Ok(())
    }

    pub fn fps(&self) -> PianoResult<Fps> {
        Fps::integer(self.video.frame_rate)
    }

    /// Fade steps in effect; a disabled direction has no steps.
    pub fn fade_profile(&self) -> FadeProfile {
        let v = &self.video;
        FadeProfile {
            fade_in: if v.note_fade_in {
                v.fade_in_steps.clone()
            } else {
                Vec::new()
            },
            fade_out: if v.note_fade_out {
                v.fade_out_steps.clone()
            } else {
                Vec::new()
            },
        }
    }

    pub fn key_colors(&self) -> KeyColors {
        let p = &self.piano;
        KeyColors {
            white_fill: p.color_white_keys,
            black_fill: p.color_black_keys,
            white_outline: p.outline_color_white_keys,
            black_outline: p.outline_color_black_keys,
            highlight_outline: p.outline_color_highlight,
        }
    }

    pub fn highlight(&self) -> Rgb8 {
        self.piano.color_highlight
    }
}

fn merge_tables(base: &mut toml::Table, over: toml::Table) {
    for (key, value) in over {
        let toml::Value::Table(o) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(toml::Value::Table(b)) = base.get_mut(&key) {
            merge_tables(b, o);
            continue;
        }
        base.insert(key, toml::Value::Table(o));
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
