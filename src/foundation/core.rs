use crate::foundation::error::{PianoError, PianoResult};

pub use kurbo::{Affine, BezPath, Point, Rect};

/// Zero-based output frame number.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Rational frame rate. The encoder pipeline only produces integer rates (`den == 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> PianoResult<Self> {
        if den == 0 {
            return Err(PianoError::config("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(PianoError::config("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn integer(fps: u32) -> PianoResult<Self> {
        Self::new(fps, 1)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_micros(self) -> f64 {
        1_000_000.0 * f64::from(self.den) / f64::from(self.num)
    }

    /// End of frame `index`'s time window, in microseconds.
    pub fn frame_end_micros(self, index: FrameIndex) -> f64 {
        (index.0 + 1) as f64 * self.frame_duration_micros()
    }

    /// Number of frames needed to cover `micros`, rounded up.
    pub fn frames_for_micros_ceil(self, micros: f64) -> u64 {
        (micros / 1_000_000.0 * self.as_f64()).ceil().max(0.0) as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> PianoResult<Self> {
        if width == 0 || height == 0 {
            return Err(PianoError::config(format!(
                "canvas must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }
}
