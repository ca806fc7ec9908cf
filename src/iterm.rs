//! iTerm2 / WezTerm inline image protocol.
//!
//! The whole file is sent in one `OSC 1337` sequence:
//! `ESC ]1337;File=inline=1;size=<len>:<base64> BEL`.
//!
//! See <https://iterm2.com/documentation-images.html>.

use crate::raster::{RasterImage, JPEG_QUALITY};
use crate::{tmux, Result, Settings};
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use std::io::{self, Read, Write};

pub const ITERM_IMG_HDR: &str = "\x1b]1337;File=inline=1";
pub const ITERM_IMG_FTR: &str = "\x07";

/// Re-encode `image` and send it inline.
///
/// Paletted images go out as PNG, truecolor ones as JPEG, which the
/// terminal decodes noticeably faster for photos.
pub fn iterm_write_image<W: Write + ?Sized>(
    out: &mut W,
    image: &RasterImage,
    settings: &Settings,
) -> Result<()> {
    let data = match image {
        RasterImage::Paletted(_) => image.to_png()?,
        RasterImage::Rgba(_) => image.to_jpeg(JPEG_QUALITY)?,
    };
    iterm_copy_file_inline(out, &mut data.as_slice(), data.len() as u64, settings)
}

/// Send an already encoded image file (any format the terminal can decode).
///
/// `len` is the size of the file in bytes, before base64 encoding.
pub fn iterm_copy_file_inline<R, W>(out: &mut W, input: &mut R, len: u64, settings: &Settings) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let (open, close) = tmux::open_close(ITERM_IMG_HDR, ITERM_IMG_FTR, settings.escape_tmux);
    log::debug!("iterm: sending {len} byte file (tmux: {})", settings.escape_tmux);

    write!(out, "{open};size={len}:")?;

    {
        let mut enc64 = EncoderWriter::new(&mut *out, &STANDARD);
        io::copy(input, &mut enc64)?;
        enc64.finish()?;
    }

    out.write_all(close.as_bytes())?;
    Ok(())
}
