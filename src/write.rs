//! Serializing an archive: local headers with payloads, the central
//! directory, then the trailer and its XZIP comment.
//!
//! Output is deterministic given the directory order and the
//! alignment/format settings. When an alignment is set, padding in each
//! local header's extra field pushes the payload bytes onto the next
//! power-of-two boundary so console storage can DMA them without
//! straddling sectors; the compatible format duplicates that padding in
//! the central directory, the compact format omits it.

use std::io::{Seek, Write};

use tracing::debug;

use crate::archive::XzipArchive;
use crate::result::XzipResult;
use crate::spec::{
    self, CentralDirectoryHeader, EndOfCentralDirRecord, LocalFileHeader, XZIP_COMMENT_LENGTH,
};
use crate::stream::{BufferWriteStream, FileWriteStream, WriteStream};
use crate::types::{name_to_bytes, PayloadLocation};

impl XzipArchive {
    /// Serialize the archive onto the end of `buffer`.
    pub fn save_to_buffer(&mut self, buffer: &mut Vec<u8>) -> XzipResult<()> {
        let mut stream = BufferWriteStream::new(buffer);
        self.save_directory(&mut stream)
    }

    /// Serialize the archive through a seekable handle, starting at its
    /// current position.
    pub fn save_to_disk<W: Write + Seek>(&mut self, writer: W) -> XzipResult<()> {
        let mut stream = FileWriteStream::new(writer);
        self.save_directory(&mut stream)
    }

    /// Exact size of the serialized archive, headers and padding
    /// included. Callers use this to pre-allocate output buffers.
    pub fn calculate_size(&self) -> u32 {
        let mut size = 0u32;
        let mut directory_size = 0u32;
        for entry in &self.entries {
            if entry.compressed_size == 0 || !entry.payload.is_available() {
                continue;
            }
            let name_length = name_to_bytes(&entry.file_name).len() as u32;
            let padding = self.calculate_padding(name_length as usize, size) as u32;

            size += LocalFileHeader::SIZE + name_length + padding + entry.compressed_size;

            // every file has a directory header that duplicates the
            // filename, and in compatible format the padding too
            directory_size += CentralDirectoryHeader::SIZE + name_length;
            if self.compatible_format {
                directory_size += padding;
            }
        }

        let directory_start = self.align_up(size);
        let directory_end = self.align_up(directory_start + directory_size);
        directory_end + EndOfCentralDirRecord::SIZE + XZIP_COMMENT_LENGTH as u32
    }

    /// Bytes of extra-field padding that push a payload starting after
    /// `position` plus a local header and its name onto the next
    /// alignment boundary.
    pub(crate) fn calculate_padding(&self, file_name_length: usize, position: u32) -> u16 {
        if self.alignment == 0 {
            return 0;
        }
        let header_end = position + LocalFileHeader::SIZE + file_name_length as u32;
        ((self.alignment - header_end % self.alignment) % self.alignment) as u16
    }

    fn align_up(&self, value: u32) -> u32 {
        if self.alignment == 0 {
            return value;
        }
        (value + self.alignment - 1) & !(self.alignment - 1)
    }

    /// Emit the three archive regions through a write sink. The archive
    /// may land in the middle of a larger stream; all recorded offsets
    /// are relative to the sink position at entry.
    fn save_directory(&mut self, stream: &mut dyn WriteStream) -> XzipResult<()> {
        let zip_start = stream.tell()?;

        // Region 1: local headers and payloads, in directory order.
        // Collect which entries were emitted; the central directory pass
        // walks the same list.
        let mut emitted: Vec<usize> = Vec::new();
        for index in 0..self.entries.len() {
            if self.entries[index].compressed_size == 0
                || !self.entries[index].payload.is_available()
            {
                continue;
            }

            let zip_offset = (stream.tell()? - zip_start) as u32;
            self.entries[index].zip_offset = zip_offset;

            let entry = &self.entries[index];
            let name_bytes = name_to_bytes(&entry.file_name);
            let file_name_length = name_bytes.len();
            let extra_field_length = self.calculate_padding(file_name_length, zip_offset);

            let header = LocalFileHeader {
                version_needed_to_extract: entry.compression_method.version_needed(),
                flags: 0,
                compression_method: entry.compression_method.to_u16(),
                last_modified_time: 0,
                last_modified_date: 0,
                crc32: entry.crc32,
                compressed_size: entry.compressed_size,
                uncompressed_size: entry.uncompressed_size,
                file_name_length: file_name_length as u16,
                extra_field_length,
            };
            let mut encoded = Vec::with_capacity(LocalFileHeader::SIZE as usize);
            header.write(&mut encoded, self.endian)?;
            stream.put(&encoded)?;
            stream.put(&name_bytes)?;
            stream.put(&vec![0u8; extra_field_length as usize])?;

            match &self.entries[index].payload {
                PayloadLocation::InMemory(bytes) => stream.put(bytes)?,
                PayloadLocation::DiskCache(offset) => {
                    // draw the payload back from the write cache
                    let offset = *offset;
                    let length = self.entries[index].compressed_size as usize;
                    let cache = self
                        .cache
                        .as_mut()
                        .expect("disk-cached payload without a cache");
                    let bytes = cache.read(offset, length)?;
                    stream.put(&bytes)?;
                }
                PayloadLocation::Empty | PayloadLocation::SourceArchive(_) => unreachable!(),
            }
            emitted.push(index);
        }

        // Region 2: central directory, aligned on both sides.
        let region_end = (stream.tell()? - zip_start) as u32;
        let directory_start = self.align_up(region_end);
        if directory_start > region_end {
            stream.put(&vec![0u8; (directory_start - region_end) as usize])?;
        }

        for &index in &emitted {
            let entry = &self.entries[index];
            let name_bytes = name_to_bytes(&entry.file_name);
            let file_name_length = name_bytes.len();
            let padding = self.calculate_padding(file_name_length, entry.zip_offset);

            let header = CentralDirectoryHeader {
                version_made_by: 20,
                version_needed_to_extract: entry.compression_method.version_needed(),
                flags: 0,
                compression_method: entry.compression_method.to_u16(),
                last_modified_time: 0,
                last_modified_date: 0,
                crc32: entry.crc32,
                compressed_size: entry.compressed_size,
                uncompressed_size: entry.uncompressed_size,
                file_name_length: file_name_length as u16,
                extra_field_length: if self.compatible_format { padding } else { 0 },
                file_comment_length: 0,
                disk_number_start: 0,
                internal_file_attributes: 0,
                external_file_attributes: 0,
                relative_offset_of_local_header: entry.zip_offset,
            };
            let mut encoded = Vec::with_capacity(CentralDirectoryHeader::SIZE as usize);
            header.write(&mut encoded, self.endian)?;
            stream.put(&encoded)?;
            stream.put(&name_bytes)?;
            if self.compatible_format {
                stream.put(&vec![0u8; padding as usize])?;
            }
        }

        let region_end = (stream.tell()? - zip_start) as u32;
        let directory_end = self.align_up(region_end);
        if directory_end > region_end {
            stream.put(&vec![0u8; (directory_end - region_end) as usize])?;
        }

        // Region 3: trailer and the XZIP comment.
        let record = EndOfCentralDirRecord {
            number_of_this_disk: 0,
            disk_with_central_directory: 0,
            entries_on_this_disk: emitted.len() as u16,
            entries_total: emitted.len() as u16,
            central_directory_size: directory_end - directory_start,
            start_of_central_dir_offset: directory_start,
            comment_length: XZIP_COMMENT_LENGTH as u16,
        };
        let mut encoded = Vec::with_capacity(EndOfCentralDirRecord::SIZE as usize);
        record.write(&mut encoded, self.endian)?;
        stream.put(&encoded)?;
        stream.put(&spec::format_comment(self.compatible_format, self.alignment))?;

        debug!(
            entries = emitted.len(),
            bytes = directory_end + EndOfCentralDirRecord::SIZE + XZIP_COMMENT_LENGTH as u32,
            "archive serialized"
        );
        Ok(())
    }
}
