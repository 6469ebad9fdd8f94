use super::*;
use crate::keyboard::range::KeyRange;

fn rasterizer() -> CpuRasterizer {
    // C4..=C5: eight white keys, 20 px each.
    let layout = KeyboardLayout::compute(KeyRange::new(60, 72).unwrap(), 160, 40).unwrap();
    CpuRasterizer::new(Arc::new(layout), KeyColors::default()).unwrap()
}

fn rgb(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 3] {
    let [r, g, b, _] = frame.pixel(x, y).unwrap();
    [r, g, b]
}

#[test]
fn idle_keyboard_uses_base_fills() {
    let r = rasterizer();
    let frame = r.rasterize(&ActiveNotes::new()).unwrap();
    assert_eq!((frame.width, frame.height), (160, 40));
    assert_eq!(frame.data.len(), 160 * 40 * 4);
    assert_eq!(r.size(), (160, 40));

    // Lower part of C4 and the middle of C#4.
    assert_eq!(rgb(&frame, 10, 35), [0xff, 0xff, 0xff]);
    assert_eq!(rgb(&frame, 18, 8), [0x13, 0x13, 0x13]);
    assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn active_keys_take_their_highlight() {
    let r = rasterizer();
    let red = Rgb8::new(0xde, 0x44, 0x39);
    let mut active = ActiveNotes::new();
    active.insert(60, red);
    active.insert(61, Rgb8::new(0x40, 0x10, 0x10));
    let frame = r.rasterize(&active).unwrap();

    assert_eq!(rgb(&frame, 10, 35), [0xde, 0x44, 0x39]);
    assert_eq!(rgb(&frame, 18, 8), [0x40, 0x10, 0x10]);
    // D4 is untouched.
    assert_eq!(rgb(&frame, 30, 35), [0xff, 0xff, 0xff]);
}

#[test]
fn rasterizing_is_deterministic() {
    let r = rasterizer();
    let mut active = ActiveNotes::new();
    active.insert(64, Rgb8::new(0xde, 0x44, 0x39));
    let a = r.rasterize(&active).unwrap();
    let b = r.rasterize(&active).unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn oversized_canvas_is_a_render_error() {
    let layout = KeyboardLayout::compute(KeyRange::new(60, 72).unwrap(), 70_000, 40).unwrap();
    let err = CpuRasterizer::new(Arc::new(layout), KeyColors::default()).unwrap_err();
    assert!(matches!(err, PianoError::Render(_)));
}
