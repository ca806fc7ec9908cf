//! In-memory rasters handed to the encoders.
//!
//! Decoding image files is left to the caller; the encoders only need
//! either a paletted image (SIXEL) or something the `image` crate can
//! serialize to PNG/JPEG (Kitty, iTerm2).

use crate::{RastermError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbImage, RgbaImage};

/// JPEG quality used when a truecolor raster is re-encoded for iTerm2.
pub const JPEG_QUALITY: u8 = 93;

/// Palette entry with 16-bit color components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb16 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl Rgb16 {
    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Self { r, g, b }
    }

    /// Narrow back to 8 bits per channel.
    pub fn to_rgb8(self) -> [u8; 3] {
        [(self.r >> 8) as u8, (self.g >> 8) as u8, (self.b >> 8) as u8]
    }
}

impl From<[u8; 3]> for Rgb16 {
    /// Widen 8-bit channels so that 0xFF maps to 0xFFFF.
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self {
            r: r as u16 * 257,
            g: g as u16 * 257,
            b: b as u16 * 257,
        }
    }
}

/// An image whose pixels are indices into a palette.
///
/// Width or height may be zero; such an image simply encodes to nothing.
/// The palette may hold more than 256 entries, the SIXEL encoder decides
/// what to do with the surplus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PalettedImage {
    width: usize,
    height: usize,
    palette: Vec<Rgb16>,
    indices: Vec<u8>,
}

impl PalettedImage {
    /// Create a paletted image from row-major pixel indices.
    pub fn new(width: usize, height: usize, palette: Vec<Rgb16>, indices: Vec<u8>) -> Result<Self> {
        let expected = width.checked_mul(height).ok_or(RastermError::BufferSizeMismatch {
            expected: usize::MAX,
            actual: indices.len(),
        })?;
        if indices.len() != expected {
            return Err(RastermError::BufferSizeMismatch {
                expected,
                actual: indices.len(),
            });
        }
        Ok(Self {
            width,
            height,
            palette,
            indices,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn palette(&self) -> &[Rgb16] {
        &self.palette
    }

    #[inline]
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Palette index of the pixel at (x, y). Coordinates outside the image read as index 0.
    #[inline]
    pub fn color_index_at(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.indices[y * self.width + x]
    }

    /// Expand the palette lookup into an RGB image. Indices with no
    /// palette entry become black.
    pub fn to_rgb8(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let ix = self.indices[y as usize * self.width + x as usize] as usize;
            let rgb = self.palette.get(ix).copied().unwrap_or_default();
            image::Rgb(rgb.to_rgb8())
        })
    }
}

/// A raster as seen by the protocol encoders, resolved once at the boundary.
#[derive(Clone, Debug)]
pub enum RasterImage {
    /// Already quantized; usable by every protocol.
    Paletted(PalettedImage),
    /// Truecolor; SIXEL output needs quantizing it first.
    Rgba(RgbaImage),
}

impl RasterImage {
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            RasterImage::Paletted(img) => (img.width(), img.height()),
            RasterImage::Rgba(img) => (img.width() as usize, img.height() as usize),
        }
    }

    /// Re-encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            RasterImage::Paletted(img) => img.to_rgb8().write_with_encoder(PngEncoder::new(&mut buf))?,
            RasterImage::Rgba(img) => img.write_with_encoder(PngEncoder::new(&mut buf))?,
        }
        Ok(buf)
    }

    /// Re-encode as JPEG. Alpha is dropped.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let rgb = match self {
            RasterImage::Paletted(img) => img.to_rgb8(),
            RasterImage::Rgba(img) => DynamicImage::ImageRgba8(img.clone()).to_rgb8(),
        };
        let mut buf = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
        Ok(buf)
    }
}

impl From<PalettedImage> for RasterImage {
    fn from(img: PalettedImage) -> Self {
        RasterImage::Paletted(img)
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(img: RgbaImage) -> Self {
        RasterImage::Rgba(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb16_widening() {
        assert_eq!(Rgb16::from([255, 0, 128]), Rgb16::new(0xFFFF, 0, 0x8080));
        assert_eq!(Rgb16::from([12, 34, 56]).to_rgb8(), [12, 34, 56]);
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let result = PalettedImage::new(3, 2, vec![Rgb16::default()], vec![0; 5]);
        assert!(matches!(
            result,
            Err(RastermError::BufferSizeMismatch {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_color_index_at_bounds() {
        let img = PalettedImage::new(2, 1, vec![Rgb16::default(); 2], vec![0, 1]).unwrap();
        assert_eq!(img.color_index_at(1, 0), 1);
        assert_eq!(img.color_index_at(2, 0), 0);
        assert_eq!(img.color_index_at(0, 1), 0);
    }

    #[test]
    fn test_dimensions_overflow_rejected() {
        let result = PalettedImage::new(usize::MAX, 2, vec![Rgb16::default()], vec![0]);
        assert!(matches!(
            result,
            Err(RastermError::BufferSizeMismatch {
                expected: usize::MAX,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_dimensions() {
        let paletted = PalettedImage::new(3, 2, vec![Rgb16::default()], vec![0; 6]).unwrap();
        assert_eq!(RasterImage::from(paletted).dimensions(), (3, 2));
        assert_eq!(RasterImage::from(RgbaImage::new(5, 4)).dimensions(), (5, 4));
    }

    #[test]
    fn test_png_signature() {
        let img = PalettedImage::new(1, 1, vec![Rgb16::from([1, 2, 3])], vec![0]).unwrap();
        let png = RasterImage::from(img).to_png().unwrap();
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn test_jpeg_signature() {
        let img = RasterImage::from(RgbaImage::new(4, 4));
        let jpeg = img.to_jpeg(JPEG_QUALITY).unwrap();
        assert!(jpeg.starts_with(&[0xFF, 0xD8]));
    }
}
