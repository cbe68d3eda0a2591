//! A reader/writer crate for the XZIP archive format.
//!
//! XZIP is the ZIP-compatible container a well-known game engine uses to
//! package console assets. Two extensions ride in the archive's trailing
//! comment: a version tag choosing between the *compatible* serialization
//! (`XZP1`, central directory duplicates the local extra-field padding)
//! and the *compact* one (`XZP2`, padding in local headers only), and an
//! alignment that places every payload on a power-of-two boundary.
//! Archives may be little- or big-endian and store entries uncompressed
//! or LZMA-compressed with ZIP 5.8.8 framing.
//!
//! ```
//! use xzip::{CompressionMethod, XzipArchive};
//!
//! # fn doit() -> xzip::XzipResult<()> {
//! let mut archive = XzipArchive::new();
//! archive.force_alignment(true, true, 512);
//! archive.add_buffer("materials/wall.vmt", b"\"LightmappedGeneric\"", false,
//!     CompressionMethod::Stored)?;
//!
//! let mut bytes = Vec::new();
//! archive.save_to_buffer(&mut bytes)?;
//!
//! let mut reopened = XzipArchive::new();
//! reopened.open_from_buffer(&bytes)?;
//! assert!(reopened.file_exists("materials/wall.vmt"));
//! # Ok(())
//! # }
//! # doit().unwrap();
//! ```

pub use archive::XzipArchive;
pub use compression::CompressionMethod;
pub use result::{XzipError, XzipResult};
pub use spec::Endianness;
pub use types::{PayloadLocation, SortOrder, ZipEntry};

mod archive;
pub mod compression;
mod disk_cache;
pub mod lzma;
mod read;
pub mod result;
pub mod spec;
pub mod stream;
pub mod text;
pub mod types;
mod write;
