//! Fixed-size chunking writer.
//!
//! [`ChunkWriter`] buffers everything written to it into windows of exactly
//! `capacity` bytes. Each full window (and the final partial one, on
//! [`ChunkWriter::flush_chunk`]) is handed to an optional [`ChunkTransform`]
//! whose output is what actually reaches the inner writer. The Kitty encoder
//! uses this to frame base64 text into protocol chunks.

use crate::{RastermError, Result};
use std::io::{self, Write};

/// Window size used by the Kitty encoder.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Rewrites one chunk of data before it is written to the inner sink.
///
/// State that must survive between chunks (e.g. "first chunk already sent")
/// lives in the implementing type.
pub trait ChunkTransform {
    /// Append the transformed form of `chunk` to `out`.
    fn apply(&mut self, chunk: &[u8], out: &mut Vec<u8>);
}

impl<F: FnMut(&[u8], &mut Vec<u8>)> ChunkTransform for F {
    fn apply(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        self(chunk, out)
    }
}

/// Transform used when a [`ChunkWriter`] writes chunks unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl ChunkTransform for Passthrough {
    fn apply(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(chunk);
    }
}

/// A writer that forwards data in windows of `capacity` bytes.
///
/// Callers must invoke [`flush_chunk`](Self::flush_chunk) once all input is
/// written to emit the trailing partial window. `Write::flush` only flushes
/// the inner writer and never cuts a chunk short.
#[derive(Debug)]
pub struct ChunkWriter<W: Write, T = Passthrough> {
    inner: W,
    chunk: Box<[u8]>,
    pos: usize,
    transform: Option<T>,
    scratch: Vec<u8>,
}

impl<W: Write> ChunkWriter<W, Passthrough> {
    /// Create a chunk writer that writes chunks to `inner` as they are.
    pub fn new(inner: W, capacity: usize) -> Result<Self> {
        Self::build(inner, capacity, None)
    }
}

impl<W: Write, T: ChunkTransform> ChunkWriter<W, T> {
    /// Create a chunk writer that passes every chunk through `transform`.
    pub fn with_transform(inner: W, capacity: usize, transform: T) -> Result<Self> {
        Self::build(inner, capacity, Some(transform))
    }

    fn build(inner: W, capacity: usize, transform: Option<T>) -> Result<Self> {
        if capacity < 1 {
            return Err(RastermError::InvalidChunkSize(capacity));
        }
        Ok(Self {
            inner,
            chunk: vec![0; capacity].into_boxed_slice(),
            pos: 0,
            transform,
            scratch: Vec::new(),
        })
    }

    /// Size of one chunk window.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunk.len()
    }

    /// Number of bytes waiting in the current window.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.pos
    }

    /// Emit the buffered window, even when it is empty, and reset it.
    ///
    /// Returns the number of data bytes (before transformation) that were
    /// flushed. The window is reset even when the write fails.
    pub fn flush_chunk(&mut self) -> io::Result<usize> {
        let len = self.pos;
        self.pos = 0;
        let data = &self.chunk[..len];
        match self.transform.as_mut() {
            Some(transform) => {
                self.scratch.clear();
                transform.apply(data, &mut self.scratch);
                self.inner.write_all(&self.scratch)?;
            }
            None => self.inner.write_all(data)?,
        }
        Ok(len)
    }

    /// Shared access to the transform, if any.
    pub fn transform(&self) -> Option<&T> {
        self.transform.as_ref()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the inner writer. Buffered data that was never flushed is lost.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write, T: ChunkTransform> Write for ChunkWriter<W, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while !rest.is_empty() {
            let n = rest.len().min(self.chunk.len() - self.pos);
            self.chunk[self.pos..self.pos + n].copy_from_slice(&rest[..n]);
            self.pos += n;
            rest = &rest[n..];

            if self.pos >= self.chunk.len() {
                self.flush_chunk()?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        let result = ChunkWriter::new(Vec::new(), 0);
        assert!(matches!(result, Err(RastermError::InvalidChunkSize(0))));
    }

    #[test]
    fn test_passthrough() {
        let mut w = ChunkWriter::new(Vec::new(), 3).unwrap();
        w.write_all(b"abcdefg").unwrap();
        assert_eq!(w.get_ref(), b"abcdef");
        assert_eq!(w.buffered(), 1);
        assert_eq!(w.flush_chunk().unwrap(), 1);
        assert_eq!(w.into_inner(), b"abcdefg");
    }

    #[test]
    fn test_transform_sees_windows() {
        let frame = |chunk: &[u8], out: &mut Vec<u8>| {
            out.push(b'[');
            out.extend_from_slice(chunk);
            out.push(b']');
        };
        let mut w = ChunkWriter::with_transform(Vec::new(), 2, frame).unwrap();
        w.write_all(b"ab").unwrap();
        w.write_all(b"cde").unwrap();
        w.flush_chunk().unwrap();
        w.flush_chunk().unwrap();
        assert_eq!(w.into_inner(), b"[ab][cd][e][]");
    }

    #[test]
    fn test_write_flush_does_not_cut_chunk() {
        let mut w = ChunkWriter::new(Vec::new(), 4).unwrap();
        w.write_all(b"ab").unwrap();
        w.flush().unwrap();
        assert!(w.get_ref().is_empty());
        assert_eq!(w.buffered(), 2);
    }
}
