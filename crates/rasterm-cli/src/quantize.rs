//! Palette reduction for SIXEL output.

use quantette::{
    deps::palette::Srgb, dither::FloydSteinberg, ImageRef, PaletteSize, Pipeline, QuantizeMethod,
};
use rasterm::{PalettedImage, Rgb16};
use std::collections::HashMap;

/// Turn an RGBA image into a paletted one with at most `max_colors` entries.
///
/// Images that already use few enough colors keep them exactly; everything
/// else goes through Wu quantization with Floyd-Steinberg dithering.
/// Alpha is ignored.
pub fn to_paletted(
    img: &image::RgbaImage,
    max_colors: u16,
) -> Result<PalettedImage, Box<dyn std::error::Error>> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let max_colors = max_colors.clamp(2, 256);

    if let Some(exact) = exact_palette(img, max_colors as usize) {
        log::debug!("{} distinct colors, skipping quantization", exact.palette().len());
        return Ok(exact);
    }

    let rgb_pixels: Vec<Srgb<u8>> = img
        .pixels()
        .map(|p| Srgb::new(p[0], p[1], p[2]))
        .collect();

    let palette_size = u8::try_from(max_colors)
        .ok()
        .and_then(|n| PaletteSize::try_from(n).ok())
        .unwrap_or(PaletteSize::MAX);
    let image =
        ImageRef::new(width as u32, height as u32, &rgb_pixels).map_err(|e| e.to_string())?;

    let indexed_image = Pipeline::new()
        .palette_size(palette_size)
        .quantize_method(QuantizeMethod::Wu)
        .ditherer(FloydSteinberg::new())
        .input_image(image)
        .output_srgb8_indexed_image();

    let palette: Vec<Rgb16> = indexed_image
        .palette()
        .iter()
        .map(|c| Rgb16::from([c.red, c.green, c.blue]))
        .collect();
    let indices = indexed_image.indices().to_vec();

    Ok(PalettedImage::new(width, height, palette, indices)?)
}

fn exact_palette(img: &image::RgbaImage, max_colors: usize) -> Option<PalettedImage> {
    let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
    let mut palette = Vec::new();
    let mut indices = Vec::with_capacity(img.width() as usize * img.height() as usize);

    for p in img.pixels() {
        let rgb = [p[0], p[1], p[2]];
        let ix = match lookup.get(&rgb) {
            Some(&ix) => ix,
            None => {
                if palette.len() >= max_colors {
                    return None;
                }
                let ix = palette.len() as u8;
                lookup.insert(rgb, ix);
                palette.push(Rgb16::from(rgb));
                ix
            }
        };
        indices.push(ix);
    }

    PalettedImage::new(img.width() as usize, img.height() as usize, palette, indices).ok()
}
