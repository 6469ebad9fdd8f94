use super::*;

#[test]
fn parses_hex_with_and_without_hash() {
    assert_eq!(Rgb8::parse_hex("#DE4439").unwrap(), Rgb8::new(0xde, 0x44, 0x39));
    assert_eq!(Rgb8::parse_hex("131313").unwrap(), Rgb8::new(0x13, 0x13, 0x13));
    assert!(Rgb8::parse_hex("#12345").is_err());
    assert!(Rgb8::parse_hex("#gg0000").is_err());
    assert!(Rgb8::parse_hex("#ff0000ff").is_err());
}

#[test]
fn display_is_lowercase_hex() {
    assert_eq!(Rgb8::new(0xde, 0x44, 0x39).to_string(), "#de4439");
}

#[test]
fn zero_adjustment_round_trips() {
    for c in [
        Rgb8::new(0xde, 0x44, 0x39),
        Rgb8::new(0x6e, 0x16, 0x0f),
        Rgb8::new(0xff, 0xff, 0xff),
        Rgb8::new(0x13, 0x13, 0x13),
        Rgb8::new(0x20, 0x80, 0xc0),
    ] {
        assert_eq!(c.adjust_lightness(0.0), c, "{c}");
    }
}

#[test]
fn darkening_scales_lightness_and_keeps_hue() {
    let c = Rgb8::new(0xde, 0x44, 0x39);
    let d = c.adjust_lightness(-0.2);
    let ratio = d.lightness() / c.lightness();
    assert!((ratio - 0.8).abs() < 0.01, "ratio {ratio}");
    // Red stays the dominant channel.
    assert!(d.r > d.g && d.r > d.b);
}

#[test]
fn lightening_clamps_to_white() {
    assert_eq!(
        Rgb8::new(0xde, 0x44, 0x39).adjust_lightness(5.0),
        Rgb8::new(0xff, 0xff, 0xff)
    );
    assert_eq!(
        Rgb8::new(0, 0, 0).adjust_lightness(0.8),
        Rgb8::new(0, 0, 0)
    );
}

#[test]
fn pure_red_has_half_lightness() {
    assert!((Rgb8::new(255, 0, 0).lightness() - 0.5).abs() < 1e-12);
}
