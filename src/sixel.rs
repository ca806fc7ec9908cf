//! DECSIXEL encoder for paletted images.
//!
//! The image is cut into bands of six scanlines. For every band, each color
//! that occurs in it gets one pass over the band's columns; a column becomes
//! one sixel character whose low six bits say which of the six rows carry
//! that color. Equal neighbouring sixels are run-length encoded.
//!
//! This encoder does not quantize: callers hand over an image that already
//! has a palette of at most 256 colors. Transparency is not supported.
//!
//! See <https://www.vt100.net/docs/vt3xx-gp/chapter14.html>.

use crate::raster::{PalettedImage, Rgb16};
use crate::{tmux, RastermError, Result, SIXEL_PALETTE_MAX};
use std::io::Write;

/// Smallest sixel character (`?`, no bits set).
pub const SIXEL_MIN: u8 = 0x3f;
/// Largest sixel character (`~`, all six bits set).
pub const SIXEL_MAX: u8 = 0x7e;

const SIXEL_HEIGHT: usize = 6;
/// Runs longer than this are written with the repeat introducer.
const MAX_LITERAL_RUN: usize = 3;

/// What to do with palette entries past the 256 SIXEL color registers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PalettePolicy {
    /// Silently ignore the surplus entries.
    #[default]
    Truncate,
    /// Fail with [`RastermError::PaletteTooLarge`].
    Strict,
}

/// Options for the SIXEL encoder.
#[derive(Clone, Debug, Default)]
pub struct SixelOptions {
    pub palette_policy: PalettePolicy,
}

/// Encode a paletted image as DECSIXEL and write it to `out`.
///
/// Images with zero width or height, or with an empty palette, produce no
/// output at all. A failed write aborts the encoding; whatever was already
/// written stays written.
pub fn sixel_encode<W: Write + ?Sized>(
    image: &PalettedImage,
    out: &mut W,
    settings: &crate::Settings,
    opts: &SixelOptions,
) -> Result<()> {
    let (width, height) = (image.width(), image.height());
    let palette = image.palette();

    if width == 0 || height == 0 || palette.is_empty() {
        log::debug!("sixel: nothing to draw ({width}x{height}, {} colors)", palette.len());
        return Ok(());
    }
    if opts.palette_policy == PalettePolicy::Strict && palette.len() > SIXEL_PALETTE_MAX {
        return Err(RastermError::PaletteTooLarge { len: palette.len() });
    }
    let palette = &palette[..palette.len().min(SIXEL_PALETTE_MAX)];
    let n_colors = palette.len();

    log::debug!(
        "sixel: encoding {width}x{height} with {n_colors} colors (tmux: {})",
        settings.escape_tmux
    );

    let (open, close) = tmux::open_close("\x1b", crate::ST, settings.escape_tmux);

    // DCS introducer: ESC P p1 ; p2 q
    // p1=0: aspect ratio comes from the raster attributes
    // p2=1: pixels without a color keep the background
    // Raster attributes "Pan;Pad;Ph;Pv (1:1 aspect ratio, image size)
    let mut line = Vec::with_capacity(64);
    line.extend_from_slice(open.as_bytes());
    line.extend_from_slice(b"P0;1q\"1;1;");
    write_number(&mut line, width);
    line.push(b';');
    write_number(&mut line, height);
    line.push(b'\n');

    // Define palette in RGB percent (0-100)
    for (i, c) in palette.iter().enumerate() {
        write_color(&mut line, i, c);
    }
    out.write_all(&line)?;

    let mut colors_used = vec![false; n_colors];
    let mut sixels = vec![0u8; width * n_colors];

    let bands = height.div_ceil(SIXEL_HEIGHT);
    for band in 0..bands {
        line.clear();

        // Graphics new line
        if band > 0 {
            line.push(b'-');
        }

        fill_band(image, band * SIXEL_HEIGHT, &mut colors_used, &mut sixels);

        let mut first_color = true;
        for (color_index, _) in colors_used.iter().enumerate().filter(|(_, used)| **used) {
            // Graphics carriage return: overlay the next color on the same band
            if !first_color {
                line.push(b'$');
            }
            first_color = false;

            line.push(b'#');
            write_number(&mut line, color_index);

            let row = &sixels[color_index * width..(color_index + 1) * width];
            encode_runs(&mut line, row);
        }

        out.write_all(&line)?;
    }

    out.write_all(close.as_bytes())?;
    Ok(())
}

/// Encode into an in-memory string.
#[must_use = "this returns the encoded SIXEL string"]
pub fn sixel_string(
    image: &PalettedImage,
    settings: &crate::Settings,
    opts: &SixelOptions,
) -> Result<String> {
    let mut out = Vec::new();
    sixel_encode(image, &mut out, settings, opts)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Convert a 16-bit color component to a whole percentage.
#[inline]
pub fn percent(v: u16) -> u8 {
    (((v as u32 + 1) * 100) >> 16) as u8
}

/// DECGCI color definition: `#<index>;2;<r%>;<g%>;<b%>`.
fn write_color(out: &mut Vec<u8>, index: usize, c: &Rgb16) {
    out.push(b'#');
    write_number(out, index);
    out.extend_from_slice(b";2;");
    write_number(out, percent(c.r) as usize);
    out.push(b';');
    write_number(out, percent(c.g) as usize);
    out.push(b';');
    write_number(out, percent(c.b) as usize);
}

/// Recompute color usage and per-color sixel rows for the band starting at `y0`.
///
/// `sixels` holds one row of `width` bytes per palette color. All six rows
/// are scanned; rows past the image height read as index 0. Pixels whose
/// index has no palette entry stay blank.
fn fill_band(image: &PalettedImage, y0: usize, colors_used: &mut [bool], sixels: &mut [u8]) {
    let width = image.width();
    let n_colors = colors_used.len();
    colors_used.fill(false);
    sixels.fill(0);

    for (bit, y) in (y0..y0 + SIXEL_HEIGHT).enumerate() {
        for x in 0..width {
            let ix = image.color_index_at(x, y) as usize;
            if ix >= n_colors {
                continue;
            }
            colors_used[ix] = true;
            sixels[ix * width + x] |= 1 << bit;
        }
    }
}

/// Run-length encode one color's row of 6-bit sixel values.
pub fn encode_runs(out: &mut Vec<u8>, row: &[u8]) {
    let mut iter = row.iter().copied();
    let Some(mut prev) = iter.next() else {
        return;
    };
    let mut run_len = 1usize;
    for next in iter {
        if next != prev {
            push_run(out, run_len, prev);
            prev = next;
            run_len = 0;
        }
        run_len += 1;
    }
    push_run(out, run_len, prev);
}

/// Write a run of `run_len` identical sixels.
///
/// Up to three are written literally, longer runs use the graphics repeat
/// introducer `!<count><sixel>`. Only the low six bits of `bits` are used.
pub fn push_run(out: &mut Vec<u8>, run_len: usize, bits: u8) {
    if run_len == 0 {
        return;
    }
    let ch = SIXEL_MIN + (bits & 0x3f);
    if run_len > MAX_LITERAL_RUN {
        out.push(b'!');
        write_number(out, run_len);
        out.push(ch);
    } else {
        out.extend(std::iter::repeat(ch).take(run_len));
    }
}

/// Expand a string of run tokens back into 6-bit sixel values.
///
/// Bytes outside of sixel characters and `!<count>` prefixes are ignored.
pub fn decode_runs(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut repeat: Option<usize> = None;
    for &b in data {
        match b {
            b'!' => repeat = Some(0),
            b'0'..=b'9' if repeat.is_some() => {
                repeat = repeat.map(|n| n * 10 + (b - b'0') as usize);
            }
            SIXEL_MIN..=SIXEL_MAX => {
                let count = repeat.take().unwrap_or(1);
                out.extend(std::iter::repeat(b - SIXEL_MIN).take(count));
            }
            _ => {}
        }
    }
    out
}

/// Fast number to ASCII without allocation
#[inline]
fn write_number(out: &mut Vec<u8>, mut n: usize) {
    if n == 0 {
        out.push(b'0');
        return;
    }

    let mut buf = [0u8; 20];
    let mut i = buf.len();

    while n > 0 {
        i -= 1;
        buf[i] = b'0' + (n % 10) as u8;
        n /= 10;
    }

    out.extend_from_slice(&buf[i..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn runs(row: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_runs(&mut out, row);
        out
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0), 0);
        assert_eq!(percent(0xFFFF), 100);
        assert_eq!(percent(0x8080), 50);
    }

    #[test]
    fn test_run_threshold() {
        assert_eq!(runs(&[1, 1, 1]), b"@@@");
        assert_eq!(runs(&[1, 1, 1, 1]), b"!4@");
        assert_eq!(runs(&[0, 63, 63, 0]), b"?~~?");
    }

    #[test]
    fn test_push_run_empty() {
        let mut out = Vec::new();
        push_run(&mut out, 0, 5);
        assert!(out.is_empty());
    }

    #[test]
    fn test_push_run_masks_high_bits() {
        let mut out = Vec::new();
        push_run(&mut out, 1, 0xff);
        assert_eq!(out, b"~");
    }

    #[test]
    fn test_write_number() {
        let mut out = Vec::new();
        write_number(&mut out, 0);
        out.push(b' ');
        write_number(&mut out, 1234567);
        assert_eq!(out, b"0 1234567");
    }

    #[test]
    fn test_tmux_wrapped_frame() {
        let img = PalettedImage::new(1, 1, vec![Rgb16::from([0, 0, 0])], vec![0]).unwrap();
        let settings = Settings { escape_tmux: true };
        let s = sixel_string(&img, &settings, &SixelOptions::default()).unwrap();
        assert!(s.starts_with("\x1bPtmux;\x1b\x1bP0;1q"));
        assert!(s.ends_with("\x1b\x1b\\\x1b\\"));
    }

    #[test]
    fn test_out_of_palette_index_skipped() {
        let img = PalettedImage::new(2, 1, vec![Rgb16::from([0, 0, 0])], vec![0, 7]).unwrap();
        let s = sixel_string(&img, &Settings::default(), &SixelOptions::default()).unwrap();
        assert!(s.ends_with("#0~}\x1b\\"));
        assert!(!s.contains("#7"));
    }

    proptest! {
        #[test]
        fn runs_round_trip(row in proptest::collection::vec(0u8..64, 0..200)) {
            prop_assert_eq!(decode_runs(&runs(&row)), row);
        }

        #[test]
        fn sixel_chars_in_range(bits in any::<u8>(), len in 1usize..4) {
            let mut out = Vec::new();
            push_run(&mut out, len, bits);
            prop_assert!(out.iter().all(|&b| (SIXEL_MIN..=SIXEL_MAX).contains(&b)));
        }
    }
}
