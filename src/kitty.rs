//! Kitty graphics protocol encoder.
//!
//! PNG bytes are base64 encoded and sent in frames of at most 4096 encoded
//! bytes:
//!
//! ```text
//! ESC _G a=T,f=100,t=d,m=1;<base64> ESC \    first frame, carries the control data
//! ESC _G m=1;<base64> ESC \                  every following frame
//! ESC _G m=0; ESC \                          end of image
//! ```
//!
//! See <https://sw.kovidgoyal.net/kitty/graphics-protocol/>.

use crate::chunk::{ChunkTransform, ChunkWriter};
use crate::raster::RasterImage;
use crate::{tmux, RastermError, Result, Settings};
use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderWriter;
use base64::Engine;
use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::path::Path;

pub const KITTY_IMG_HDR: &str = "\x1b_G";
pub const KITTY_IMG_FTR: &str = crate::ST;

/// Maximum number of base64 bytes in one frame.
pub const KITTY_CHUNK_SIZE: usize = crate::chunk::DEFAULT_CHUNK_SIZE;

/// Optional placement keys. Zero means "let the terminal decide" and the key is omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KittyImgOpts {
    pub src_x: u32,         // x=
    pub src_y: u32,         // y=
    pub src_width: u32,     // w=
    pub src_height: u32,    // h=
    pub cell_offset_x: u32, // X= (pixel x-offset inside terminal cell)
    pub cell_offset_y: u32, // Y= (pixel y-offset inside terminal cell)
    pub dst_cols: u32,      // c= (display width in terminal columns)
    pub dst_rows: u32,      // r= (display height in terminal rows)
    pub z_index: i32,       // z=
    pub image_id: u32,      // i=
    pub image_no: u32,      // I=
    pub placement_id: u32,  // p=
}

impl KittyImgOpts {
    /// Comma separated control data: the `base` keys first, then every non-zero placement key.
    pub fn control_data(&self, base: &[&str]) -> String {
        let fields = [
            ('x', self.src_x),
            ('y', self.src_y),
            ('w', self.src_width),
            ('h', self.src_height),
            ('X', self.cell_offset_x),
            ('Y', self.cell_offset_y),
            ('c', self.dst_cols),
            ('r', self.dst_rows),
            ('i', self.image_id),
            ('I', self.image_no),
            ('p', self.placement_id),
        ];

        let mut keys: Vec<String> = base.iter().map(|s| s.to_string()).collect();
        keys.extend(
            fields
                .iter()
                .filter(|(_, v)| *v != 0)
                .map(|(code, v)| format!("{code}={v}")),
        );
        if self.z_index != 0 {
            keys.push(format!("z={}", self.z_index));
        }
        keys.join(",")
    }
}

/// Frames one chunk of base64 text. The control data goes into the first frame only.
#[derive(Debug)]
struct KittyFrame {
    header: String,
    footer: String,
    params: String,
    params_emitted: bool,
}

impl ChunkTransform for KittyFrame {
    fn apply(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(self.header.as_bytes());
        if !self.params_emitted {
            self.params_emitted = true;
            if !self.params.is_empty() {
                out.extend_from_slice(self.params.as_bytes());
                out.push(b',');
            }
        }
        out.extend_from_slice(b"m=1;");
        out.extend_from_slice(chunk);
        out.extend_from_slice(self.footer.as_bytes());
        log::trace!("kitty: frame with {} bytes of payload", chunk.len());
    }
}

/// Stream PNG data from `input` to the terminal.
///
/// `len`, when given, is announced to the terminal as the expected data
/// size (`S=`). [`kitty_write_image`] and plain file copies pass `None`, so
/// the key is left out and the terminal takes the size from the frames.
///
/// The closing `m=0` frame is written even when streaming the data failed.
/// The first error encountered is the one returned; a terminator failure
/// after an earlier error is only logged.
pub fn kitty_copy_png_inline<R, W>(
    out: &mut W,
    input: &mut R,
    len: Option<u64>,
    opts: &KittyImgOpts,
    settings: &Settings,
) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let (header, footer) = tmux::open_close(KITTY_IMG_HDR, KITTY_IMG_FTR, settings.escape_tmux);

    let size = len.map(|n| format!("S={n}"));
    let mut base = vec!["a=T", "f=100", "t=d"];
    if let Some(size) = &size {
        base.push(size);
    }
    log::debug!("kitty: streaming inline image (tmux: {})", settings.escape_tmux);

    let terminator = format!("{header}m=0;{footer}");
    let frame = KittyFrame {
        header,
        footer,
        params: opts.control_data(&base),
        params_emitted: false,
    };

    let frames = write_frames(out, input, frame);
    let done = out.write_all(terminator.as_bytes()).map_err(RastermError::from);
    if let (Err(first), Err(second)) = (&frames, &done) {
        log::warn!("kitty: failed to terminate image after '{first}': {second}");
    }
    frames.and(done)
}

/// PNG -> base64 -> chunker -> out
fn write_frames<R, W>(out: &mut W, input: &mut R, frame: KittyFrame) -> Result<()>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let chunker = ChunkWriter::with_transform(out, KITTY_CHUNK_SIZE, frame)?;
    let mut enc64 = EncoderWriter::new(chunker, &STANDARD);
    io::copy(input, &mut enc64)?;
    let mut chunker = enc64.finish()?;
    chunker.flush_chunk()?;
    Ok(())
}

/// Re-encode `image` as PNG and stream it inline.
pub fn kitty_write_image<W: Write + ?Sized>(
    out: &mut W,
    image: &RasterImage,
    opts: &KittyImgOpts,
    settings: &Settings,
) -> Result<()> {
    let png = image.to_png()?;
    kitty_copy_png_inline(out, &mut png.as_slice(), None, opts, settings)
}

/// Tell the terminal to load a PNG file itself.
///
/// The path must be absolute and readable by the terminal process.
pub fn kitty_write_png_local<W: Write + ?Sized>(
    out: &mut W,
    path: &Path,
    opts: &KittyImgOpts,
    settings: &Settings,
) -> Result<()> {
    if !path.is_absolute() {
        return Err(RastermError::RelativePath(path.to_path_buf()));
    }
    let (header, footer) = tmux::open_close(KITTY_IMG_HDR, KITTY_IMG_FTR, settings.escape_tmux);
    let params = opts.control_data(&["a=T", "f=100", "t=f"]);
    let payload = STANDARD.encode(path_bytes(path));
    write!(out, "{header}{params};{payload}{footer}")?;
    Ok(())
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_control_data_order() {
        let opts = KittyImgOpts {
            dst_cols: 40,
            src_x: 2,
            z_index: -1,
            image_id: 7,
            ..Default::default()
        };
        assert_eq!(opts.control_data(&["a=T"]), "a=T,x=2,c=40,i=7,z=-1");
        assert_eq!(KittyImgOpts::default().control_data(&[]), "");
    }

    #[test]
    fn test_frame_params_once() {
        let mut frame = KittyFrame {
            header: KITTY_IMG_HDR.to_owned(),
            footer: KITTY_IMG_FTR.to_owned(),
            params: "a=T".to_owned(),
            params_emitted: false,
        };
        let mut out = Vec::new();
        frame.apply(b"QUJD", &mut out);
        frame.apply(b"", &mut out);
        assert_eq!(out, b"\x1b_Ga=T,m=1;QUJD\x1b\\\x1b_Gm=1;\x1b\\");
    }

    #[test]
    fn test_size_key() {
        let mut out = Vec::new();
        let settings = Settings::default();
        kitty_copy_png_inline(&mut out, &mut &b"abc"[..], Some(3), &KittyImgOpts::default(), &settings)
            .unwrap();
        assert_eq!(out, b"\x1b_Ga=T,f=100,t=d,S=3,m=1;YWJj\x1b\\\x1b_Gm=0;\x1b\\");
    }

    #[test]
    fn test_local_requires_absolute_path() {
        let mut out = Vec::new();
        let result = kitty_write_png_local(
            &mut out,
            Path::new("relative.png"),
            &KittyImgOpts::default(),
            &Settings::default(),
        );
        assert!(matches!(result, Err(RastermError::RelativePath(_))));
        assert!(out.is_empty());
    }
}
