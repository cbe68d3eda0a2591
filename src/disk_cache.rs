//! Disk write-cache backing large entry payloads between ingest and the
//! final write.
//!
//! The cache is a single append-only temp file with no header or index;
//! each entry remembers the offset its payload was spooled at. The file
//! is unlinked by the OS as soon as it is created, so every exit path,
//! error returns included, releases it.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub(crate) struct DiskCache {
    file: File,
}

impl DiskCache {
    /// Create an empty cache, in `dir` when given, else in the system
    /// temp directory.
    pub fn new(dir: Option<&Path>) -> io::Result<DiskCache> {
        let file = match dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(DiskCache { file })
    }

    /// Append a payload, returning the offset it was written at.
    pub fn append(&mut self, data: &[u8]) -> io::Result<u64> {
        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(data)?;
        Ok(offset)
    }

    /// Read `length` payload bytes back from `offset`.
    pub fn read(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; length];
        self.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}
