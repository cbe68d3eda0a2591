//! Output sink abstraction for the serializer.
//!
//! The writer needs exactly two capabilities: append bytes and report the
//! current offset. Offsets are absolute within the underlying sink, so an
//! archive may be written into the middle of a larger stream.

use std::io::{Seek, Write};

use crate::result::XzipResult;

/// Minimal write sink the serializer emits through.
pub trait WriteStream {
    fn put(&mut self, data: &[u8]) -> XzipResult<()>;
    fn tell(&mut self) -> XzipResult<u64>;
}

/// Sink appending to an in-memory byte buffer.
pub struct BufferWriteStream<'a> {
    buffer: &'a mut Vec<u8>,
}

impl<'a> BufferWriteStream<'a> {
    pub fn new(buffer: &'a mut Vec<u8>) -> BufferWriteStream<'a> {
        BufferWriteStream { buffer }
    }
}

impl WriteStream for BufferWriteStream<'_> {
    fn put(&mut self, data: &[u8]) -> XzipResult<()> {
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    fn tell(&mut self) -> XzipResult<u64> {
        Ok(self.buffer.len() as u64)
    }
}

/// Sink writing through any seekable handle (a `File`, a `Cursor`, ...).
pub struct FileWriteStream<W: Write + Seek> {
    inner: W,
}

impl<W: Write + Seek> FileWriteStream<W> {
    pub fn new(inner: W) -> FileWriteStream<W> {
        FileWriteStream { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> WriteStream for FileWriteStream<W> {
    fn put(&mut self, data: &[u8]) -> XzipResult<()> {
        self.inner.write_all(data)?;
        Ok(())
    }

    fn tell(&mut self) -> XzipResult<u64> {
        Ok(self.inner.stream_position()?)
    }
}
