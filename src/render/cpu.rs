use std::sync::Arc;

use crate::foundation::color::Rgb8;
use crate::foundation::core::{BezPath, Point};
use crate::foundation::error::{PianoError, PianoResult};
use crate::frames::sequencer::ActiveNotes;
use crate::keyboard::geometry::KeyboardLayout;
use crate::render::backend::{FrameRGBA, FrameRasterizer, KeyColors};

/// Outline width in pixels.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

/// Software rasterizer built on `vello_cpu`.
///
/// Each call owns its own render context and pixmap, so one instance can serve a thread pool.
#[derive(Clone, Debug)]
pub struct CpuRasterizer {
    layout: Arc<KeyboardLayout>,
    colors: KeyColors,
    background: Rgb8,
    stroke_width: f64,
    width: u16,
    height: u16,
}

impl CpuRasterizer {
    pub fn new(layout: Arc<KeyboardLayout>, colors: KeyColors) -> PianoResult<Self> {
        let canvas = layout.canvas();
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| PianoError::render("frame width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| PianoError::render("frame height exceeds u16"))?;
        Ok(Self {
            layout,
            background: colors.black_outline,
            colors,
            stroke_width: DEFAULT_STROKE_WIDTH,
            width,
            height,
        })
    }

    pub fn with_stroke_width(mut self, stroke_width: f64) -> Self {
        self.stroke_width = stroke_width;
        self
    }

    pub fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    fn draw_key(
        &self,
        ctx: &mut vello_cpu::RenderContext,
        path: &BezPath,
        fill: Rgb8,
        outline: Rgb8,
    ) {
        let cpu_path = bezpath_to_cpu(path);
        ctx.set_paint(color_to_cpu(fill));
        ctx.fill_path(&cpu_path);
        if self.stroke_width > 0.0 {
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(self.stroke_width));
            ctx.set_paint(color_to_cpu(outline));
            ctx.stroke_path(&cpu_path);
        }
    }
}

impl FrameRasterizer for CpuRasterizer {
    fn rasterize(&self, active: &ActiveNotes) -> PianoResult<FrameRGBA> {
        let mut ctx = vello_cpu::RenderContext::new(self.width, self.height);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

        ctx.set_paint(color_to_cpu(self.background));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));

        // Black keys go last so their outlines sit on top of the neighbouring white keys.
        for white_pass in [true, false] {
            for (key, path) in self.layout.keys_with_outlines() {
                if key.is_white != white_pass {
                    continue;
                }
                let (fill, outline) = self
                    .colors
                    .paint_for(key.is_white, active.get(&key.note).copied());
                self.draw_key(&mut ctx, path, fill, outline);
            }
        }

        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            // Every paint is opaque, so premultiplied and straight alpha coincide.
            data: pixmap.data_as_u8_slice().to_vec(),
        })
    }

    fn size(&self) -> (u32, u32) {
        (u32::from(self.width), u32::from(self.height))
    }
}

fn color_to_cpu(c: Rgb8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, 255)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
