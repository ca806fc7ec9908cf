use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pretty_assertions::assert_eq;
use rasterm::iterm::{ITERM_IMG_FTR, ITERM_IMG_HDR};
use rasterm::*;

/// Returns the announced size and the decoded payload.
fn parse(out: &[u8]) -> (usize, Vec<u8>) {
    let text = std::str::from_utf8(out).unwrap();
    let body = text
        .strip_prefix(ITERM_IMG_HDR)
        .and_then(|t| t.strip_suffix(ITERM_IMG_FTR))
        .expect("missing OSC 1337 framing");
    let (size, data) = body
        .strip_prefix(";size=")
        .and_then(|b| b.split_once(':'))
        .expect("missing size");
    (size.parse().unwrap(), STANDARD.decode(data).unwrap())
}

#[test]
fn test_paletted_image_as_png() {
    let img = PalettedImage::new(3, 3, vec![Rgb16::from([9, 9, 9])], vec![0; 9]).unwrap();
    let mut out = Vec::new();
    iterm_write_image(&mut out, &RasterImage::from(img), &Settings::default()).unwrap();

    let (size, data) = parse(&out);
    assert_eq!(size, data.len());
    assert!(data.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[test]
fn test_rgba_image_as_jpeg() {
    let img = image::RgbaImage::from_pixel(8, 8, image::Rgba([200, 10, 10, 128]));
    let mut out = Vec::new();
    iterm_write_image(&mut out, &RasterImage::from(img), &Settings::default()).unwrap();

    let (size, data) = parse(&out);
    assert_eq!(size, data.len());
    assert!(data.starts_with(&[0xFF, 0xD8, 0xFF]));
}

#[test]
fn test_copy_file_inline_round_trip() {
    let file: Vec<u8> = (0..=255).collect();
    let mut out = Vec::new();
    iterm_copy_file_inline(&mut out, &mut file.as_slice(), file.len() as u64, &Settings::default())
        .unwrap();

    let (size, data) = parse(&out);
    assert_eq!(size, 256);
    assert_eq!(data, file);
}
