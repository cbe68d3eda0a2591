//! Fixed ZIP structures as constrained by the XZIP format, plus the
//! 10-byte trailing comment that carries the XZIP configuration.
//!
//! All structures can be read and written in either byte order; an XZIP
//! archive targeting a big-endian console stores every header field
//! byteswapped.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::result::{XzipError, XzipResult};

pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;
pub const CENTRAL_DIRECTORY_HEADER_SIGNATURE: u32 = 0x02014b50;
pub const CENTRAL_DIRECTORY_END_SIGNATURE: u32 = 0x06054b50;

/// Fixed length of the XZIP trailer comment.
pub const XZIP_COMMENT_LENGTH: usize = 10;

/// Byte order of an archive's fixed header fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    pub fn read_u16<R: Read>(self, reader: &mut R) -> io::Result<u16> {
        match self {
            Endianness::Little => reader.read_u16::<LittleEndian>(),
            Endianness::Big => reader.read_u16::<BigEndian>(),
        }
    }

    pub fn read_u32<R: Read>(self, reader: &mut R) -> io::Result<u32> {
        match self {
            Endianness::Little => reader.read_u32::<LittleEndian>(),
            Endianness::Big => reader.read_u32::<BigEndian>(),
        }
    }

    pub fn write_u16<W: Write>(self, writer: &mut W, value: u16) -> io::Result<()> {
        match self {
            Endianness::Little => writer.write_u16::<LittleEndian>(value),
            Endianness::Big => writer.write_u16::<BigEndian>(value),
        }
    }

    pub fn write_u32<W: Write>(self, writer: &mut W, value: u32) -> io::Result<()> {
        match self {
            Endianness::Little => writer.write_u32::<LittleEndian>(value),
            Endianness::Big => writer.write_u32::<BigEndian>(value),
        }
    }
}

/// The 30-byte record preceding each entry's payload bytes.
///
/// XZIP pins most fields: flags and timestamps are zero, the extra field
/// carries alignment padding only.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub version_needed_to_extract: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_modified_time: u16,
    pub last_modified_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIZE: u32 = 30;

    pub fn parse<R: Read>(reader: &mut R, endian: Endianness) -> XzipResult<LocalFileHeader> {
        let signature = endian.read_u32(reader)?;
        if signature != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(XzipError::InvalidArchive("invalid local file header"));
        }
        Ok(LocalFileHeader {
            version_needed_to_extract: endian.read_u16(reader)?,
            flags: endian.read_u16(reader)?,
            compression_method: endian.read_u16(reader)?,
            last_modified_time: endian.read_u16(reader)?,
            last_modified_date: endian.read_u16(reader)?,
            crc32: endian.read_u32(reader)?,
            compressed_size: endian.read_u32(reader)?,
            uncompressed_size: endian.read_u32(reader)?,
            file_name_length: endian.read_u16(reader)?,
            extra_field_length: endian.read_u16(reader)?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W, endian: Endianness) -> XzipResult<()> {
        endian.write_u32(writer, LOCAL_FILE_HEADER_SIGNATURE)?;
        endian.write_u16(writer, self.version_needed_to_extract)?;
        endian.write_u16(writer, self.flags)?;
        endian.write_u16(writer, self.compression_method)?;
        endian.write_u16(writer, self.last_modified_time)?;
        endian.write_u16(writer, self.last_modified_date)?;
        endian.write_u32(writer, self.crc32)?;
        endian.write_u32(writer, self.compressed_size)?;
        endian.write_u32(writer, self.uncompressed_size)?;
        endian.write_u16(writer, self.file_name_length)?;
        endian.write_u16(writer, self.extra_field_length)?;
        Ok(())
    }
}

/// The 46-byte central directory record, one per entry.
#[derive(Debug, Clone)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed_to_extract: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_modified_time: u16,
    pub last_modified_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_comment_length: u16,
    pub disk_number_start: u16,
    pub internal_file_attributes: u16,
    pub external_file_attributes: u32,
    pub relative_offset_of_local_header: u32,
}

impl CentralDirectoryHeader {
    pub const SIZE: u32 = 46;

    pub fn parse<R: Read>(reader: &mut R, endian: Endianness) -> XzipResult<CentralDirectoryHeader> {
        let signature = endian.read_u32(reader)?;
        if signature != CENTRAL_DIRECTORY_HEADER_SIGNATURE {
            return Err(XzipError::InvalidArchive("invalid central directory header"));
        }
        Ok(CentralDirectoryHeader {
            version_made_by: endian.read_u16(reader)?,
            version_needed_to_extract: endian.read_u16(reader)?,
            flags: endian.read_u16(reader)?,
            compression_method: endian.read_u16(reader)?,
            last_modified_time: endian.read_u16(reader)?,
            last_modified_date: endian.read_u16(reader)?,
            crc32: endian.read_u32(reader)?,
            compressed_size: endian.read_u32(reader)?,
            uncompressed_size: endian.read_u32(reader)?,
            file_name_length: endian.read_u16(reader)?,
            extra_field_length: endian.read_u16(reader)?,
            file_comment_length: endian.read_u16(reader)?,
            disk_number_start: endian.read_u16(reader)?,
            internal_file_attributes: endian.read_u16(reader)?,
            external_file_attributes: endian.read_u32(reader)?,
            relative_offset_of_local_header: endian.read_u32(reader)?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W, endian: Endianness) -> XzipResult<()> {
        endian.write_u32(writer, CENTRAL_DIRECTORY_HEADER_SIGNATURE)?;
        endian.write_u16(writer, self.version_made_by)?;
        endian.write_u16(writer, self.version_needed_to_extract)?;
        endian.write_u16(writer, self.flags)?;
        endian.write_u16(writer, self.compression_method)?;
        endian.write_u16(writer, self.last_modified_time)?;
        endian.write_u16(writer, self.last_modified_date)?;
        endian.write_u32(writer, self.crc32)?;
        endian.write_u32(writer, self.compressed_size)?;
        endian.write_u32(writer, self.uncompressed_size)?;
        endian.write_u16(writer, self.file_name_length)?;
        endian.write_u16(writer, self.extra_field_length)?;
        endian.write_u16(writer, self.file_comment_length)?;
        endian.write_u16(writer, self.disk_number_start)?;
        endian.write_u16(writer, self.internal_file_attributes)?;
        endian.write_u32(writer, self.external_file_attributes)?;
        endian.write_u32(writer, self.relative_offset_of_local_header)?;
        Ok(())
    }
}

/// The 22-byte ZIP trailer. In an XZIP archive the comment that follows
/// it is always exactly [`XZIP_COMMENT_LENGTH`] bytes.
#[derive(Debug, Clone)]
pub struct EndOfCentralDirRecord {
    pub number_of_this_disk: u16,
    pub disk_with_central_directory: u16,
    pub entries_on_this_disk: u16,
    pub entries_total: u16,
    pub central_directory_size: u32,
    pub start_of_central_dir_offset: u32,
    pub comment_length: u16,
}

impl EndOfCentralDirRecord {
    pub const SIZE: u32 = 22;

    pub fn parse<R: Read>(reader: &mut R, endian: Endianness) -> XzipResult<EndOfCentralDirRecord> {
        let signature = endian.read_u32(reader)?;
        if signature != CENTRAL_DIRECTORY_END_SIGNATURE {
            return Err(XzipError::InvalidArchive("invalid end of central directory record"));
        }
        Ok(EndOfCentralDirRecord {
            number_of_this_disk: endian.read_u16(reader)?,
            disk_with_central_directory: endian.read_u16(reader)?,
            entries_on_this_disk: endian.read_u16(reader)?,
            entries_total: endian.read_u16(reader)?,
            central_directory_size: endian.read_u32(reader)?,
            start_of_central_dir_offset: endian.read_u32(reader)?,
            comment_length: endian.read_u16(reader)?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W, endian: Endianness) -> XzipResult<()> {
        endian.write_u32(writer, CENTRAL_DIRECTORY_END_SIGNATURE)?;
        endian.write_u16(writer, self.number_of_this_disk)?;
        endian.write_u16(writer, self.disk_with_central_directory)?;
        endian.write_u16(writer, self.entries_on_this_disk)?;
        endian.write_u16(writer, self.entries_total)?;
        endian.write_u32(writer, self.central_directory_size)?;
        endian.write_u32(writer, self.start_of_central_dir_offset)?;
        endian.write_u16(writer, self.comment_length)?;
        Ok(())
    }

    /// Locate and parse the trailer by walking backwards from the end of
    /// the source.
    ///
    /// Because the XZIP comment is fixed-length the record sits at a
    /// known distance from EOF; the first probe hits immediately when no
    /// comment is present and within [`XZIP_COMMENT_LENGTH`] probes
    /// otherwise. The full record is re-read at each candidate offset.
    ///
    /// On success the reader is positioned just past the record, at the
    /// first comment byte.
    pub fn find_and_parse<R: Read + Seek>(
        reader: &mut R,
        endian: Endianness,
    ) -> XzipResult<(EndOfCentralDirRecord, u64)> {
        let file_length = reader.seek(SeekFrom::End(0))?;
        if file_length < Self::SIZE as u64 {
            return Err(XzipError::InvalidArchive(
                "too small to hold an end of central directory record",
            ));
        }

        let mut pos = file_length - Self::SIZE as u64;
        loop {
            reader.seek(SeekFrom::Start(pos))?;
            if endian.read_u32(reader)? == CENTRAL_DIRECTORY_END_SIGNATURE {
                reader.seek(SeekFrom::Start(pos))?;
                let record = EndOfCentralDirRecord::parse(reader, endian)?;
                return Ok((record, pos));
            }
            if pos == 0 {
                break;
            }
            pos -= 1;
        }
        Err(XzipError::InvalidArchive("could not find end of central directory record"))
    }
}

/// Format the XZIP trailer comment: `XZP1` for the compatible layout,
/// `XZP2` for the compact one, then the alignment in ASCII decimal,
/// NUL-padded to the fixed length.
pub fn format_comment(compatible_format: bool, alignment: u32) -> [u8; XZIP_COMMENT_LENGTH] {
    let mut comment = [0u8; XZIP_COMMENT_LENGTH];
    let text = format!(
        "XZP{} {}",
        if compatible_format { '1' } else { '2' },
        alignment
    );
    let n = text.len().min(XZIP_COMMENT_LENGTH);
    comment[..n].copy_from_slice(&text.as_bytes()[..n]);
    comment
}

/// Parse an XZIP trailer comment back into (compatible-format, alignment).
///
/// Returns `None` when the comment does not carry the XZIP tag, in which
/// case the archive is a plain ZIP and the caller's configuration stands.
/// A non-power-of-two alignment is silently zeroed.
pub fn parse_comment(comment: &[u8]) -> Option<(bool, u32)> {
    if comment.len() < 4 || !comment[..3].eq_ignore_ascii_case(b"XZP") {
        return None;
    }
    let compatible_format = comment[3] != b'2';

    let mut alignment: u32 = 0;
    let digits: Vec<u8> = comment[4..]
        .iter()
        .copied()
        .skip_while(|b| *b == b' ')
        .take_while(u8::is_ascii_digit)
        .collect();
    if !digits.is_empty() {
        // Digits only, so from_utf8 cannot fail; overflow falls back to 0
        alignment = std::str::from_utf8(&digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
    }
    if !alignment.is_power_of_two() {
        alignment = 0;
    }
    Some((compatible_format, alignment))
}
