//! # rasterm
//!
//! Render raster images in a terminal as in-band escape sequences.
//!
//! ## Protocols
//!
//! - **SIXEL**: palette-indexed, run-length encoded 6-scanline bands (DECSIXEL)
//! - **Kitty**: base64 PNG stream split into 4096 byte framed chunks
//! - **iTerm2 / WezTerm**: a single base64 `OSC 1337` file transfer
//!
//! Every encoder can wrap its escape sequences for tmux/screen pass-through.
//! Whether that is needed is decided by the caller (see [`term::Capabilities`]);
//! the encoders never look at the environment themselves.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rasterm::{sixel_encode, PalettedImage, Rgb16, Settings, SixelOptions};
//!
//! let palette = vec![Rgb16::from([255, 0, 0]), Rgb16::from([0, 0, 255])];
//! let image = PalettedImage::new(2, 2, palette, vec![0, 1, 1, 0])?;
//! let mut out = std::io::stdout().lock();
//! sixel_encode(&image, &mut out, &Settings::default(), &SixelOptions::default())?;
//! ```

use std::path::PathBuf;
use thiserror::Error;

pub mod chunk;
pub mod iterm;
pub mod kitty;
pub mod raster;
pub mod sixel;
pub mod term;
pub mod tmux;

pub use chunk::{ChunkTransform, ChunkWriter, Passthrough};
pub use iterm::{iterm_copy_file_inline, iterm_write_image};
pub use kitty::{kitty_copy_png_inline, kitty_write_image, kitty_write_png_local, KittyImgOpts};
pub use raster::{PalettedImage, RasterImage, Rgb16};
pub use sixel::{sixel_encode, sixel_string, PalettePolicy, SixelOptions};
pub use term::{Capabilities, Protocol};
pub use tmux::tmux_wrap;

/// Errors that can occur while encoding an image for the terminal.
#[derive(Debug, Error)]
pub enum RastermError {
    /// Writing to the output sink failed
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// A chunk writer was configured with a capacity of zero
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// Palette exceeds the 256 color registers SIXEL offers (strict mode only)
    #[error("palette has {len} colors, at most {max} are supported", max = SIXEL_PALETTE_MAX)]
    PaletteTooLarge { len: usize },

    /// Pixel index buffer doesn't match the image dimensions
    #[error("buffer size mismatch: expected {expected} indices, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The terminal must be given an absolute path to read
    #[error("path is not absolute: {}", .0.display())]
    RelativePath(PathBuf),

    /// Re-encoding the raster to PNG/JPEG failed
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// SIXEL output needs an already quantized image
    #[error("SIXEL output requires a paletted image")]
    NotPaletted,
}

/// Result type for rasterm operations.
pub type Result<T> = core::result::Result<T, RastermError>;

/// Per-call encoder settings supplied by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// Wrap escape sequences so tmux/screen forwards them to the outer terminal.
    pub escape_tmux: bool,
}

impl Settings {
    /// Settings derived from detected terminal capabilities.
    pub fn from_capabilities(caps: &Capabilities) -> Self {
        Self {
            escape_tmux: caps.multiplexer,
        }
    }
}

/// Write `image` to `out` using the given protocol.
///
/// SIXEL needs a paletted image; truecolor input is rejected with
/// [`RastermError::NotPaletted`].
pub fn write_image<W: std::io::Write>(
    out: &mut W,
    image: &RasterImage,
    protocol: Protocol,
    settings: &Settings,
) -> Result<()> {
    match (protocol, image) {
        (Protocol::Sixel, RasterImage::Paletted(img)) => {
            sixel_encode(img, out, settings, &SixelOptions::default())
        }
        (Protocol::Sixel, RasterImage::Rgba(_)) => Err(RastermError::NotPaletted),
        (Protocol::Kitty, _) => kitty_write_image(out, image, &KittyImgOpts::default(), settings),
        (Protocol::Iterm, _) => iterm_write_image(out, image, settings),
    }
}

pub(crate) const SIXEL_PALETTE_MAX: usize = 256;

/// String terminator shared by the SIXEL and Kitty protocols.
pub(crate) const ST: &str = "\x1b\\";
