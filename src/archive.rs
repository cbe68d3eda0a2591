//! The archive directory: an ordered index of entries plus the
//! configuration that controls serialization.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use tracing::warn;

use crate::compression::CompressionMethod;
use crate::disk_cache::DiskCache;
use crate::lzma;
use crate::result::{XzipError, XzipResult};
use crate::spec::Endianness;
use crate::text;
use crate::types::{name_from_bytes, PayloadLocation, SortOrder, ZipEntry};

/// Longest relative name accepted at ingest.
const MAX_NAME_LENGTH: usize = 511;

/// An XZIP archive under construction or inspection.
///
/// Entries enter through [`add_buffer`](Self::add_buffer) /
/// [`add_file`](Self::add_file) when building, or
/// [`open_from_buffer`](Self::open_from_buffer) /
/// [`open_from_disk`](Self::open_from_disk) when reading. The directory
/// keeps entries sorted by the ordering chosen at construction; that
/// in-order traversal defines the file ordering on disk.
///
/// ```
/// use xzip::{CompressionMethod, XzipArchive};
///
/// # fn doit() -> xzip::XzipResult<()> {
/// let mut archive = XzipArchive::new();
/// archive.add_buffer("scripts/init.cfg", b"echo hi\n", true, CompressionMethod::Stored)?;
///
/// let mut bytes = Vec::new();
/// archive.save_to_buffer(&mut bytes)?;
/// assert_eq!(archive.calculate_size() as usize, bytes.len());
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct XzipArchive {
    pub(crate) entries: Vec<ZipEntry>,
    order: SortOrder,
    pub(crate) alignment: u32,
    pub(crate) force_alignment: bool,
    pub(crate) compatible_format: bool,
    pub(crate) endian: Endianness,
    use_disk_cache: bool,
    disk_cache_dir: Option<PathBuf>,
    pub(crate) cache: Option<DiskCache>,
}

impl Default for XzipArchive {
    fn default() -> XzipArchive {
        XzipArchive::with_sort_order(SortOrder::ByName)
    }
}

impl XzipArchive {
    /// Create an empty archive with byte-wise name ordering and no disk
    /// cache.
    pub fn new() -> XzipArchive {
        XzipArchive::default()
    }

    /// Create an empty archive with the given directory ordering.
    pub fn with_sort_order(order: SortOrder) -> XzipArchive {
        XzipArchive {
            entries: Vec::new(),
            order,
            alignment: 0,
            force_alignment: false,
            compatible_format: true,
            endian: Endianness::Little,
            use_disk_cache: false,
            disk_cache_dir: None,
            cache: None,
        }
    }

    /// Create an empty archive that spools ingested payloads to a temp
    /// file instead of holding them in memory.
    ///
    /// The temp file lives in `cache_dir` when given, else in the system
    /// temp directory, and exists for the whole life of the archive;
    /// whether the cache is in use cannot change after construction.
    pub fn with_disk_cache(order: SortOrder, cache_dir: Option<&Path>) -> XzipResult<XzipArchive> {
        let mut archive = XzipArchive::with_sort_order(order);
        archive.use_disk_cache = true;
        archive.disk_cache_dir = cache_dir.map(Path::to_path_buf);
        archive.cache = Some(DiskCache::new(cache_dir)?);
        Ok(archive)
    }

    /// Remove every entry and reset the disk cache, returning the archive
    /// to a usable empty state.
    pub fn clear(&mut self) -> XzipResult<()> {
        self.entries.clear();
        // dropping the old cache deletes its temp file
        self.cache = None;
        if self.use_disk_cache {
            self.cache = Some(DiskCache::new(self.disk_cache_dir.as_deref())?);
        }
        Ok(())
    }

    /// Configure payload alignment and the serialization variant.
    ///
    /// When `enabled` is false the alignment is dropped but a parsed
    /// archive comment may still reinstate one; when true the given
    /// alignment also survives [`open_from_buffer`](Self::open_from_buffer).
    /// A non-power-of-two alignment silently resets to 0.
    pub fn force_alignment(&mut self, enabled: bool, compatible_format: bool, alignment: u32) {
        self.force_alignment = enabled;
        self.compatible_format = compatible_format;
        self.alignment = alignment;
        if !enabled || !self.alignment.is_power_of_two() {
            self.alignment = 0;
        }
    }

    /// The alignment forced by the caller, 0 when none is.
    pub fn alignment(&self) -> u32 {
        if !self.force_alignment {
            return 0;
        }
        self.alignment
    }

    /// True when the archive serializes in the compatible (`XZP1`)
    /// format, duplicating local padding into the central directory.
    pub fn is_compatible_format(&self) -> bool {
        self.compatible_format
    }

    /// Select big- or little-endian layout for all header fields.
    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.endian = if big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        };
    }

    /// Force byte swapping relative to the native little-endian layout.
    pub fn activate_byte_swapping(&mut self, activate: bool) {
        self.set_big_endian(activate);
    }

    /// Number of entries in the directory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// In-order iteration over the directory.
    pub fn entries(&self) -> impl Iterator<Item = &ZipEntry> {
        self.entries.iter()
    }

    /// Cursor-style directory iteration: pass `-1` to fetch the first
    /// entry, then feed each returned cursor back in. `None` marks the
    /// end of the directory.
    pub fn get_next_entry(&self, cursor: isize) -> Option<(isize, &str, u32)> {
        let next = if cursor < 0 { 0 } else { cursor as usize + 1 };
        let entry = self.entries.get(next)?;
        Some((next as isize, entry.file_name.as_str(), entry.uncompressed_size))
    }

    /// Ingest a buffer as a file with the given relative name,
    /// overwriting any entry already using it.
    ///
    /// In text mode the payload is converted to its on-disk CRLF form
    /// first; the CRC and the archived uncompressed size both describe
    /// the converted bytes. On any failure the directory is left
    /// unchanged.
    pub fn add_buffer(
        &mut self,
        relative_name: &str,
        data: &[u8],
        text_mode: bool,
        compression: CompressionMethod,
    ) -> XzipResult<()> {
        let file_name = lowercase_name(relative_name);

        let transformed;
        let bytes: &[u8] = if text_mode {
            transformed = text::text_to_disk(data);
            &transformed
        } else {
            data
        };
        let uncompressed_size = bytes.len() as u32;

        // CRC is over the final uncompressed form, before compression
        let mut hasher = Hasher::new();
        hasher.update(bytes);
        let crc32 = hasher.finalize();

        let stored: Vec<u8> = match compression {
            CompressionMethod::Stored => bytes.to_vec(),
            CompressionMethod::Lzma => match lzma::compress(bytes) {
                Ok(framed) => framed,
                Err(e) => {
                    warn!(name = %file_name, "LZMA compression failed");
                    return Err(e);
                }
            },
            CompressionMethod::Unsupported(method) => {
                return Err(XzipError::UnsupportedCompression(method));
            }
        };
        let compressed_size = stored.len() as u32;

        let payload = if compressed_size == 0 {
            PayloadLocation::Empty
        } else if let Some(cache) = &mut self.cache {
            PayloadLocation::DiskCache(cache.append(&stored)?)
        } else {
            PayloadLocation::InMemory(stored)
        };

        self.insert_entry(ZipEntry {
            file_name,
            compressed_size,
            uncompressed_size,
            crc32,
            compression_method: compression,
            payload,
            zip_offset: 0,
        });
        Ok(())
    }

    /// Read a file from disk and ingest it under the given relative name.
    pub fn add_file<P: AsRef<Path>>(
        &mut self,
        relative_name: &str,
        path: P,
        compression: CompressionMethod,
    ) -> XzipResult<()> {
        let data = fs::read(path)?;
        self.add_buffer(relative_name, &data, false, compression)
    }

    /// Fetch a file's uncompressed bytes from an in-memory payload.
    ///
    /// For entries populated by [`open_from_disk`](Self::open_from_disk)
    /// use [`read_file_from`](Self::read_file_from) with the handle that
    /// call returned.
    pub fn read_file(&self, relative_name: &str, text_mode: bool) -> XzipResult<Vec<u8>> {
        self.read_file_inner::<std::fs::File>(None, relative_name, text_mode)
    }

    /// Fetch a file's uncompressed bytes, reading the payload through
    /// `source` when it still lives in the source archive. The handle is
    /// borrowed for this call only.
    pub fn read_file_from<R: Read + Seek>(
        &self,
        source: &mut R,
        relative_name: &str,
        text_mode: bool,
    ) -> XzipResult<Vec<u8>> {
        self.read_file_inner(Some(source), relative_name, text_mode)
    }

    fn read_file_inner<R: Read + Seek>(
        &self,
        source: Option<&mut R>,
        relative_name: &str,
        text_mode: bool,
    ) -> XzipResult<Vec<u8>> {
        let index = self.lookup(relative_name).map_err(|_| XzipError::FileNotFound)?;
        let entry = &self.entries[index];
        let file_name = entry.file_name.as_str();

        let compressed: Vec<u8> = match &entry.payload {
            PayloadLocation::Empty => Vec::new(),
            PayloadLocation::InMemory(bytes) => bytes.clone(),
            PayloadLocation::SourceArchive(offset) => {
                let Some(source) = source else {
                    warn!(name = %file_name, "payload lives in the source archive and no handle was provided");
                    return Err(XzipError::PayloadUnavailable);
                };
                source.seek(SeekFrom::Start(*offset))?;
                let mut buffer = vec![0u8; entry.compressed_size as usize];
                source.read_exact(&mut buffer)?;
                buffer
            }
            PayloadLocation::DiskCache(_) => {
                warn!(name = %file_name, "payload was spooled to the write cache and is not readable");
                return Err(XzipError::PayloadUnavailable);
            }
        };

        let bytes = match entry.compression_method {
            CompressionMethod::Stored => compressed,
            CompressionMethod::Lzma => lzma::decompress(&compressed, entry.uncompressed_size)?,
            CompressionMethod::Unsupported(method) => {
                return Err(XzipError::UnsupportedCompression(method));
            }
        };

        Ok(if text_mode {
            text::text_from_disk(&bytes)
        } else {
            bytes
        })
    }

    /// True when an entry with this name (compared case-folded) exists.
    pub fn file_exists(&self, relative_name: &str) -> bool {
        self.lookup(relative_name).is_ok()
    }

    /// Remove an entry; silently does nothing when the name is absent.
    pub fn remove_file(&mut self, relative_name: &str) {
        if let Ok(index) = self.lookup(relative_name) {
            self.entries.remove(index);
        }
    }

    /// Resolve a caller-supplied name. Names handed back by the
    /// directory are already in their internal form, so when the
    /// normalized lookup misses, try the name verbatim.
    fn lookup(&self, relative_name: &str) -> Result<usize, usize> {
        self.find_index(&lowercase_name(relative_name))
            .or_else(|insert_at| self.find_index(relative_name).map_err(|_| insert_at))
    }

    pub(crate) fn find_index(&self, file_name: &str) -> Result<usize, usize> {
        let order = self.order;
        self.entries
            .binary_search_by(|entry| order.compare(&entry.file_name, file_name))
    }

    /// Insert keeping the directory sorted; an existing entry with the
    /// same name is replaced.
    pub(crate) fn insert_entry(&mut self, entry: ZipEntry) {
        match self.find_index(&entry.file_name) {
            Ok(index) => self.entries[index] = entry,
            Err(index) => self.entries.insert(index, entry),
        }
    }
}

/// Fold a relative path into the directory's internal form: ASCII
/// letters lowercased, every other byte untouched, bounded the way
/// ingest always has. Works on the name's raw bytes so non-UTF-8 wire
/// names survive intact.
pub(crate) fn lowercase_name(relative_name: &str) -> String {
    let bytes = relative_name.as_bytes();
    let end = bytes.len().min(MAX_NAME_LENGTH);
    name_from_bytes(&bytes[..end])
}
