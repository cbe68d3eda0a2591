//! Parsing XZIP archives from a byte buffer or from disk.
//!
//! Both paths share the same shape: locate the end-of-central-directory
//! record with a bounded backward scan, decode the XZIP comment that
//! follows it, then stream the central directory to populate the
//! directory index. The in-memory variant copies every payload into its
//! entry immediately; the on-disk variant records payload offsets and
//! leaves the bytes in the source file, to be fetched lazily through the
//! handle handed back to the caller.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use crate::archive::XzipArchive;
use crate::compression::CompressionMethod;
use crate::result::{XzipError, XzipResult};
use crate::spec::{self, CentralDirectoryHeader, EndOfCentralDirRecord, LocalFileHeader};
use crate::types::{name_from_bytes, PayloadLocation, ZipEntry};

/// Longest entry name accepted from a central directory.
const MAX_DIRECTORY_NAME_LENGTH: usize = 1023;

/// One central directory record reduced to what the index needs.
struct DirectoryRecord {
    file_name: String,
    compressed_size: u32,
    uncompressed_size: u32,
    crc32: u32,
    compression_method: CompressionMethod,
    /// Absolute offset of the payload bytes within the source
    data_offset: u64,
}

impl XzipArchive {
    /// Load an archive from a raw buffer, copying every payload into
    /// memory. Existing entries are discarded first; a parse failure
    /// leaves the archive empty.
    pub fn open_from_buffer(&mut self, buffer: &[u8]) -> XzipResult<()> {
        self.clear()?;
        if let Err(e) = self.parse_buffer(buffer) {
            let _ = self.clear();
            return Err(e);
        }
        Ok(())
    }

    fn parse_buffer(&mut self, buffer: &[u8]) -> XzipResult<()> {
        let mut cursor = Cursor::new(buffer);
        let record = self.read_trailer(&mut cursor)?;

        cursor.seek(SeekFrom::Start(record.start_of_central_dir_offset as u64))?;
        let records = self.read_directory(&mut cursor, record.entries_total)?;
        debug!(entries = records.len(), "parsed central directory from buffer");

        for record in records {
            let payload = if record.compressed_size > 0 {
                let start = record.data_offset as usize;
                let end = start + record.compressed_size as usize;
                if end > buffer.len() {
                    return Err(XzipError::InvalidArchive("entry data extends past end of archive"));
                }
                PayloadLocation::InMemory(buffer[start..end].to_vec())
            } else {
                PayloadLocation::Empty
            };
            self.insert_entry(ZipEntry {
                file_name: record.file_name,
                compressed_size: record.compressed_size,
                uncompressed_size: record.uncompressed_size,
                crc32: record.crc32,
                compression_method: record.compression_method,
                payload,
                zip_offset: 0,
            });
        }
        Ok(())
    }

    /// Mount an archive from disk. Payloads stay in the file; the opened
    /// handle is returned to the caller, who passes it back to
    /// [`read_file_from`](Self::read_file_from) for lazy fetches. The
    /// archive itself never retains the handle. A parse failure leaves
    /// the archive empty.
    pub fn open_from_disk<P: AsRef<Path>>(&mut self, path: P) -> XzipResult<File> {
        self.clear()?;
        let mut file = File::open(path)?;
        if let Err(e) = self.parse_disk(&mut file) {
            let _ = self.clear();
            return Err(e);
        }
        Ok(file)
    }

    fn parse_disk(&mut self, file: &mut File) -> XzipResult<()> {
        let record = self.read_trailer(file)?;

        // read the whole central directory in one request
        file.seek(SeekFrom::Start(record.start_of_central_dir_offset as u64))?;
        let mut directory = vec![0u8; record.central_directory_size as usize];
        file.read_exact(&mut directory)?;

        let mut cursor = Cursor::new(directory.as_slice());
        let records = self.read_directory(&mut cursor, record.entries_total)?;
        debug!(entries = records.len(), "parsed central directory from disk");

        for record in records {
            let payload = if record.compressed_size > 0 {
                PayloadLocation::SourceArchive(record.data_offset)
            } else {
                PayloadLocation::Empty
            };
            self.insert_entry(ZipEntry {
                file_name: record.file_name,
                compressed_size: record.compressed_size,
                uncompressed_size: record.uncompressed_size,
                crc32: record.crc32,
                compression_method: record.compression_method,
                payload,
                zip_offset: 0,
            });
        }
        Ok(())
    }

    /// Find the end-of-central-directory record and apply any XZIP
    /// configuration carried in the comment behind it.
    fn read_trailer<R: Read + Seek>(&mut self, reader: &mut R) -> XzipResult<EndOfCentralDirRecord> {
        let (record, _) = EndOfCentralDirRecord::find_and_parse(reader, self.endian)?;

        if record.comment_length > 0 {
            let length = (record.comment_length as usize).min(spec::XZIP_COMMENT_LENGTH);
            let mut comment = vec![0u8; length];
            reader.read_exact(&mut comment)?;
            if let Some((compatible_format, alignment)) = spec::parse_comment(&comment) {
                self.compatible_format = compatible_format;
                // a forced alignment wins over the archive's own
                if !self.force_alignment {
                    self.alignment = alignment;
                }
            }
        }
        Ok(record)
    }

    /// Stream `entries_total` central directory records.
    fn read_directory<R: Read + Seek>(
        &self,
        reader: &mut R,
        entries_total: u16,
    ) -> XzipResult<Vec<DirectoryRecord>> {
        let mut records = Vec::with_capacity(entries_total as usize);
        for _ in 0..entries_total {
            let header = CentralDirectoryHeader::parse(reader, self.endian)?;

            let method = CompressionMethod::from_u16(header.compression_method);
            if let CompressionMethod::Unsupported(value) = method {
                warn!(method = value, "archive entry uses an unsupported compression method");
                return Err(XzipError::UnsupportedCompression(value));
            }

            let mut name_bytes = vec![0u8; header.file_name_length as usize];
            reader.read_exact(&mut name_bytes)?;
            name_bytes.truncate(MAX_DIRECTORY_NAME_LENGTH);
            // lowercase ASCII letters only; other bytes are preserved
            // exactly so the name round-trips
            let file_name = name_from_bytes(&name_bytes);

            // payload begins past the local header and its name/padding,
            // assuming a well formed archive
            let data_offset = header.relative_offset_of_local_header as u64
                + LocalFileHeader::SIZE as u64
                + header.file_name_length as u64
                + header.extra_field_length as u64;

            // the compact format writes neither extra fields nor comments
            // into the central directory, so there is nothing to skip
            if self.compatible_format {
                let skip = header.extra_field_length as i64 + header.file_comment_length as i64;
                reader.seek(SeekFrom::Current(skip))?;
            }

            records.push(DirectoryRecord {
                file_name,
                compressed_size: header.compressed_size,
                uncompressed_size: header.uncompressed_size,
                crc32: header.crc32,
                compression_method: method,
                data_offset,
            });
        }
        Ok(records)
    }
}
