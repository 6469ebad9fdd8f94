//! Piano keyboard geometry.
//!
//! The keyboard follows a physical model where, per octave:
//!
//! 1. all seven white keys have the same width `W` at the front,
//! 2. all twelve black keys have the same width `B = 7W / 12`,
//! 3. the narrow (upper) part of C, D and E is `W - 2B/3`,
//! 4. the narrow part of F, G, A and B is `W - 3B/4`.
//!
//! Everything is computed in logical units (a white key is 100 x 200) and mapped to pixels with
//! independent horizontal and vertical scale factors, so outlines are shared between every octave
//! and every output resolution.

use kurbo::{Affine, BezPath};
use serde::Serialize;

use crate::foundation::core::Canvas;
use crate::foundation::error::{PianoError, PianoResult};
use crate::keyboard::pitch::PitchClass;
use crate::keyboard::range::KeyRange;

pub const WHITE_KEY_WIDTH: f64 = 100.0;
pub const WHITE_KEY_HEIGHT: f64 = 200.0;
pub const BLACK_KEY_HEIGHT: f64 = 120.0;

/// White and black key dimensions in logical units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct KeyDimensions {
    pub white_width: f64,
    pub white_height: f64,
    pub black_width: f64,
    pub black_height: f64,
}

impl KeyDimensions {
    pub fn new(white_width: f64, white_height: f64, black_height: f64) -> Self {
        Self {
            white_width,
            white_height,
            black_width: white_width * 7.0 / 12.0,
            black_height,
        }
    }

    /// Height of the front part of a white key that no black key overlaps.
    pub fn front_height(&self) -> f64 {
        self.white_height - self.black_height
    }
}

impl Default for KeyDimensions {
    fn default() -> Self {
        Self::new(WHITE_KEY_WIDTH, WHITE_KEY_HEIGHT, BLACK_KEY_HEIGHT)
    }
}

/// Horizontal split of a white key's upper edge: notch left, narrow part, notch right.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Segments {
    pub left: f64,
    pub middle: f64,
    pub right: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LetterSegments {
    pub c: Segments,
    pub d: Segments,
    pub e: Segments,
    pub f: Segments,
    pub g: Segments,
    pub a: Segments,
    pub b: Segments,
}

impl LetterSegments {
    pub fn resolve(dims: &KeyDimensions) -> Self {
        let w = dims.white_width;
        let bw = dims.black_width;
        let narrow_cde = w - bw * 2.0 / 3.0;
        let narrow_fgab = w - bw * 3.0 / 4.0;

        // C and F carry their narrow part on the left, E and B on the right. D, G and A sit
        // between two black keys; each left notch is whatever the previous black key still
        // needs after the previous white key's right notch.
        let c = Segments {
            left: narrow_cde,
            middle: 0.0,
            right: w - narrow_cde,
        };
        let d_left = bw - c.right;
        let d = Segments {
            left: d_left,
            middle: narrow_cde,
            right: w - d_left - narrow_cde,
        };
        let e = Segments {
            left: w - narrow_cde,
            middle: 0.0,
            right: narrow_cde,
        };
        let f = Segments {
            left: narrow_fgab,
            middle: 0.0,
            right: w - narrow_fgab,
        };
        let g_left = bw - f.right;
        let g = Segments {
            left: g_left,
            middle: narrow_fgab,
            right: w - g_left - narrow_fgab,
        };
        let a_left = bw - g.right;
        let a = Segments {
            left: a_left,
            middle: narrow_fgab,
            right: w - a_left - narrow_fgab,
        };
        let b = Segments {
            left: w - narrow_fgab,
            middle: 0.0,
            right: narrow_fgab,
        };

        Self {
            c,
            d,
            e,
            f,
            g,
            a,
            b,
        }
    }

    pub fn for_class(&self, pc: PitchClass) -> Option<Segments> {
        match pc {
            PitchClass::C => Some(self.c),
            PitchClass::D => Some(self.d),
            PitchClass::E => Some(self.e),
            PitchClass::F => Some(self.f),
            PitchClass::G => Some(self.g),
            PitchClass::A => Some(self.a),
            PitchClass::B => Some(self.b),
            _ => None,
        }
    }
}

/// Black key offsets relative to the left edge of the white key below them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BlackOffsets {
    pub c_sharp: f64,
    pub d_sharp: f64,
    pub f_sharp: f64,
    pub g_sharp: f64,
    pub a_sharp: f64,
}

impl BlackOffsets {
    pub fn resolve(seg: &LetterSegments) -> Self {
        Self {
            c_sharp: seg.c.left,
            d_sharp: seg.d.left + seg.d.middle,
            f_sharp: seg.f.left,
            g_sharp: seg.g.left + seg.g.middle,
            a_sharp: seg.a.left + seg.a.middle,
        }
    }

    pub fn for_class(&self, pc: PitchClass) -> Option<f64> {
        match pc {
            PitchClass::CSharp => Some(self.c_sharp),
            PitchClass::DSharp => Some(self.d_sharp),
            PitchClass::FSharp => Some(self.f_sharp),
            PitchClass::GSharp => Some(self.g_sharp),
            PitchClass::ASharp => Some(self.a_sharp),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

/// Outline of a single key. Widths are logical units.
///
/// ```text
///  ___        _            _          _
/// |   |      | |          | |        | |
/// |   |      | |_       _| |_      _| |
/// |   |      |   |     |     |    |   |
/// |___|      |___|     |_____|    |___|
/// Square     CShape    DShape     EShape
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum OutlineShape {
    /// Plain rectangle: every black key, and white keys whose only notch fell off the range.
    Square { width: f64, height: f64 },
    /// Notch on the right. `upper` is the narrow part, `notch` the cut-out width.
    CShape { upper: f64, notch: f64 },
    /// Notch on the left. `notch` is the cut-out width, `upper` the narrow part.
    EShape { notch: f64, upper: f64 },
    /// Notches on both sides of the narrow `middle` part.
    DShape { left: f64, middle: f64, right: f64 },
}

impl OutlineShape {
    pub fn has_left_notch(&self) -> bool {
        matches!(self, Self::EShape { .. } | Self::DShape { .. })
    }

    pub fn has_right_notch(&self) -> bool {
        matches!(self, Self::CShape { .. } | Self::DShape { .. })
    }

    /// Closed outline with its top-left corner at `(x, 0)`, in logical units.
    pub fn to_path(&self, x: f64, dims: &KeyDimensions) -> BezPath {
        let w = dims.white_width;
        let h = dims.white_height;
        let bh = dims.black_height;

        let mut p = BezPath::new();
        match *self {
            Self::Square { width, height } => {
                p.move_to((x, 0.0));
                p.line_to((x, height));
                p.line_to((x + width, height));
                p.line_to((x + width, 0.0));
            }
            Self::CShape { notch, .. } => {
                p.move_to((x, h));
                p.line_to((x + w, h));
                p.line_to((x + w, bh));
                p.line_to((x + w - notch, bh));
                p.line_to((x + w - notch, 0.0));
                p.line_to((x, 0.0));
            }
            Self::DShape { left, right, .. } => {
                p.move_to((x, h));
                p.line_to((x + w, h));
                p.line_to((x + w, bh));
                p.line_to((x + w - right, bh));
                p.line_to((x + w - right, 0.0));
                p.line_to((x + left, 0.0));
                p.line_to((x + left, bh));
                p.line_to((x, bh));
            }
            Self::EShape { notch, .. } => {
                p.move_to((x, h));
                p.line_to((x + w, h));
                p.line_to((x + w, 0.0));
                p.line_to((x + notch, 0.0));
                p.line_to((x + notch, bh));
                p.line_to((x, bh));
            }
        }
        p.close_path();
        p
    }
}

/// Derived per-note key description.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct KeySpec {
    pub note: u8,
    pub is_white: bool,
    /// Left edge in logical units, relative to the first key in range.
    pub left_offset: f64,
    pub outline: OutlineShape,
    pub width_units: f64,
    pub height_units: f64,
}

impl KeySpec {
    pub fn pitch_class(&self) -> PitchClass {
        PitchClass::of(self.note)
    }
}

/// Keyboard layout for one run: key specs plus their pixel-space outlines.
///
/// Built once from the resolved range and output size, read-only afterwards.
#[derive(Clone, Debug)]
pub struct KeyboardLayout {
    range: KeyRange,
    canvas: Canvas,
    dims: KeyDimensions,
    segments: LetterSegments,
    black_offsets: BlackOffsets,
    scale: Scale,
    white_count: usize,
    // Indexed by `note - range.from()`.
    keys: Vec<KeySpec>,
    outlines_px: Vec<BezPath>,
}

impl KeyboardLayout {
    /// Compute the layout of `range` drawn into a `width_px` x `height_px` frame.
    #[tracing::instrument]
    pub fn compute(range: KeyRange, width_px: u32, height_px: u32) -> PianoResult<Self> {
        Self::with_dimensions(range, width_px, height_px, KeyDimensions::default())
    }

    pub fn with_dimensions(
        range: KeyRange,
        width_px: u32,
        height_px: u32,
        dims: KeyDimensions,
    ) -> PianoResult<Self> {
        let canvas = Canvas::new(width_px, height_px)?;
        if !(dims.white_width > 0.0 && dims.white_height > dims.black_height && dims.black_height > 0.0)
        {
            return Err(PianoError::config(format!(
                "invalid key dimensions {dims:?}: black keys must be shorter than white keys"
            )));
        }

        let segments = LetterSegments::resolve(&dims);
        let black_offsets = BlackOffsets::resolve(&segments);
        let white_count = range.white_key_count();
        let scale = Scale {
            x: f64::from(width_px) / (white_count as f64 * dims.white_width),
            y: f64::from(height_px) / dims.white_height,
        };
        let to_px = Affine::scale_non_uniform(scale.x, scale.y);

        let mut keys = Vec::with_capacity(range.len());
        let mut outlines_px = Vec::with_capacity(range.len());
        let mut whites_so_far = 0usize;
        for note in range.notes() {
            let pc = PitchClass::of(note);
            let is_white = pc.is_white();
            if is_white {
                whites_so_far += 1;
            }

            // The range starts on a white key, so a black key always has one to its left.
            let base = whites_so_far.saturating_sub(1) as f64 * dims.white_width;
            let left_offset = base + black_offsets.for_class(pc).unwrap_or(0.0);
            let outline = outline_for(note, range, &dims, &segments);
            let (width_units, height_units) = if is_white {
                (dims.white_width, dims.white_height)
            } else {
                (dims.black_width, dims.black_height)
            };

            outlines_px.push(to_px * outline.to_path(left_offset, &dims));
            keys.push(KeySpec {
                note,
                is_white,
                left_offset,
                outline,
                width_units,
                height_units,
            });
        }

        tracing::debug!(
            %range,
            white_keys = white_count,
            scale_x = scale.x,
            scale_y = scale.y,
            "computed keyboard layout"
        );

        Ok(Self {
            range,
            canvas,
            dims,
            segments,
            black_offsets,
            scale,
            white_count,
            keys,
            outlines_px,
        })
    }

    pub fn range(&self) -> KeyRange {
        self.range
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn dimensions(&self) -> &KeyDimensions {
        &self.dims
    }

    pub fn segments(&self) -> &LetterSegments {
        &self.segments
    }

    pub fn black_offsets(&self) -> &BlackOffsets {
        &self.black_offsets
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn white_key_count(&self) -> usize {
        self.white_count
    }

    pub fn black_key_count(&self) -> usize {
        self.keys.len() - self.white_count
    }

    pub fn white_key_width_px(&self) -> f64 {
        self.dims.white_width * self.scale.x
    }

    pub fn keys(&self) -> &[KeySpec] {
        &self.keys
    }

    pub fn key(&self, note: u8) -> Option<&KeySpec> {
        self.index_of(note).map(|i| &self.keys[i])
    }

    /// Left edge of `note` in pixels.
    pub fn left_offset_px(&self, note: u8) -> Option<f64> {
        self.key(note).map(|k| k.left_offset * self.scale.x)
    }

    pub fn outline_px(&self, note: u8) -> Option<&BezPath> {
        self.index_of(note).map(|i| &self.outlines_px[i])
    }

    /// Keys paired with their pixel-space outlines, in note order.
    pub fn keys_with_outlines(&self) -> impl Iterator<Item = (&KeySpec, &BezPath)> {
        self.keys.iter().zip(self.outlines_px.iter())
    }

    fn index_of(&self, note: u8) -> Option<usize> {
        self.range
            .contains(note)
            .then(|| usize::from(note - self.range.from()))
    }
}

fn outline_for(note: u8, range: KeyRange, dims: &KeyDimensions, seg: &LetterSegments) -> OutlineShape {
    let pc = PitchClass::of(note);
    let first = note == range.from();
    let last = note == range.to();
    let full_white = OutlineShape::Square {
        width: dims.white_width,
        height: dims.white_height,
    };

    let Some(s) = seg.for_class(pc) else {
        return OutlineShape::Square {
            width: dims.black_width,
            height: dims.black_height,
        };
    };

    match pc {
        PitchClass::C | PitchClass::F => {
            if last {
                full_white
            } else {
                OutlineShape::CShape {
                    upper: s.left,
                    notch: s.right,
                }
            }
        }
        PitchClass::E | PitchClass::B => {
            if first {
                full_white
            } else {
                OutlineShape::EShape {
                    notch: s.left,
                    upper: s.right,
                }
            }
        }
        _ => {
            if first {
                OutlineShape::CShape {
                    upper: s.left + s.middle,
                    notch: s.right,
                }
            } else if last {
                OutlineShape::EShape {
                    notch: s.left,
                    upper: s.middle + s.right,
                }
            } else {
                OutlineShape::DShape {
                    left: s.left,
                    middle: s.middle,
                    right: s.right,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/keyboard/geometry.rs"]
mod tests;
