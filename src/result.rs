//! Error types that can be emitted from this library

use thiserror::Error;

/// Generic result type with XzipError as its error variant
pub type XzipResult<T> = Result<T, XzipError>;

/// Error type for XZIP archive operations
#[derive(Debug, Error)]
pub enum XzipError {
    /// An error caused by I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The archive is missing structures or contains malformed ones.
    /// The argument describes the offending structure.
    #[error("invalid XZIP archive: {0}")]
    InvalidArchive(&'static str),

    /// An entry declares a compression method other than stored or LZMA
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    /// The LZMA encoder failed or produced a stream too small to carry
    /// its own header
    #[error("LZMA compression failed: {0}")]
    CompressionFailed(&'static str),

    /// The LZMA decoder failed or produced the wrong number of bytes
    #[error("LZMA decompression failed: {0}")]
    DecompressionFailed(String),

    /// The requested file is not present in the archive directory
    #[error("specified file not found in archive")]
    FileNotFound,

    /// The entry exists but its payload cannot be reached from here: it
    /// was spooled to the disk write-cache, or it still lives in a
    /// source archive and no handle was provided
    #[error("entry payload is not available without its source")]
    PayloadUnavailable,
}
