#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rasterm::sixel::{SIXEL_MAX, SIXEL_MIN};
use rasterm::{sixel_encode, PalettedImage, Rgb16, Settings, SixelOptions};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    width: u8,
    height: u8,
    palette: Vec<(u16, u16, u16)>,
    pixels: Vec<u8>,
    escape_tmux: bool,
}

fuzz_target!(|input: FuzzInput| {
    let (width, height) = (input.width as usize, input.height as usize);
    if input.pixels.len() < width * height {
        return;
    }

    let palette = input.palette.iter().map(|&(r, g, b)| Rgb16::new(r, g, b)).collect();
    let indices = input.pixels[..width * height].to_vec();
    let Ok(image) = PalettedImage::new(width, height, palette, indices) else {
        return;
    };

    let settings = Settings {
        escape_tmux: input.escape_tmux,
    };
    let mut out = Vec::new();
    sixel_encode(&image, &mut out, &settings, &SixelOptions::default())
        .expect("encoding into memory never fails");

    if out.is_empty() {
        return;
    }
    // band data never contains control characters
    let start = out.iter().position(|&b| b == b'\n').expect("missing raster attributes") + 1;
    let end = out.len() - if input.escape_tmux { 5 } else { 2 };
    assert!(out[start..end]
        .iter()
        .all(|&b| b.is_ascii_digit() || b"#;$-!".contains(&b) || (SIXEL_MIN..=SIXEL_MAX).contains(&b)));
});
