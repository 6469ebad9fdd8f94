use std::io::Cursor;

use crate::foundation::color::Rgb8;
use crate::foundation::error::{PianoError, PianoResult};
use crate::frames::sequencer::ActiveNotes;

/// Straight-alpha RGBA8 pixels of one frame, row-major.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRGBA {
    pub fn encode_png(&self) -> PianoResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| {
                PianoError::render(format!(
                    "frame buffer of {} bytes does not match {}x{}",
                    self.data.len(),
                    self.width,
                    self.height
                ))
            })?;
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| PianoError::render(format!("png encode failed: {e}")))?;
        Ok(buf)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data.get(i..i + 4)?.try_into().ok()
    }
}

/// Fill and outline colors of the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyColors {
    pub white_fill: Rgb8,
    pub black_fill: Rgb8,
    pub white_outline: Rgb8,
    pub black_outline: Rgb8,
    pub highlight_outline: Rgb8,
}

impl Default for KeyColors {
    fn default() -> Self {
        Self {
            white_fill: Rgb8::new(0xff, 0xff, 0xff),
            black_fill: Rgb8::new(0x13, 0x13, 0x13),
            white_outline: Rgb8::new(0x13, 0x13, 0x13),
            black_outline: Rgb8::new(0x13, 0x13, 0x13),
            highlight_outline: Rgb8::new(0x6e, 0x16, 0x0f),
        }
    }
}

impl KeyColors {
    /// `(fill, outline)` for a key, given its highlight color when active.
    pub fn paint_for(&self, is_white: bool, highlight: Option<Rgb8>) -> (Rgb8, Rgb8) {
        match (highlight, is_white) {
            (Some(c), _) => (c, self.highlight_outline),
            (None, true) => (self.white_fill, self.white_outline),
            (None, false) => (self.black_fill, self.black_outline),
        }
    }
}

/// Turns an active note set into pixels.
///
/// Implementations must be deterministic: the same active set always gives the same image,
/// since frames are cached by their active set alone.
pub trait FrameRasterizer: Send + Sync {
    fn rasterize(&self, active: &ActiveNotes) -> PianoResult<FrameRGBA>;

    fn size(&self) -> (u32, u32);
}
