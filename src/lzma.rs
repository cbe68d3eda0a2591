//! LZMA codec adapter with the ZIP 5.8.8 payload framing.
//!
//! The encoder emits an LZMA-alone stream whose 13-byte header carries
//! the 5 properties bytes followed by the 64-bit uncompressed size. An
//! XZIP payload replaces that header with the ZIP framing:
//!
//! ```text
//!   version major   1 byte
//!   version minor   1 byte
//!   properties size 2 bytes, little-endian, always 5
//!   properties      5 bytes
//!   LZMA stream     remainder
//! ```
//!
//! The properties-size field is little-endian even inside a big-endian
//! archive. The stream carries no size trailer; decoders take the
//! uncompressed size from the entry header.

use crate::result::{XzipError, XzipResult};

const LZMA_PROPS_SIZE: usize = 5;
/// Properties plus the u64 uncompressed size the encoder writes.
const LZMA_ALONE_HEADER_SIZE: usize = LZMA_PROPS_SIZE + 8;

/// SDK lineage advertised in the framing; decoders ignore these bytes.
const LZMA_VERSION_MAJOR: u8 = 9;
const LZMA_VERSION_MINOR: u8 = 20;

/// Size of the ZIP framing preceding the raw stream.
pub const ZIP_LZMA_HEADER_SIZE: usize = 2 + 2 + LZMA_PROPS_SIZE;

/// Compress `data` and reframe the result as a ZIP LZMA payload.
pub fn compress(data: &[u8]) -> XzipResult<Vec<u8>> {
    let mut raw = Vec::new();
    let mut input = data;
    lzma_rs::lzma_compress(&mut input, &mut raw)?;
    if raw.len() < LZMA_ALONE_HEADER_SIZE {
        return Err(XzipError::CompressionFailed(
            "encoder produced a stream smaller than its own header",
        ));
    }

    let mut framed =
        Vec::with_capacity(ZIP_LZMA_HEADER_SIZE + raw.len() - LZMA_ALONE_HEADER_SIZE);
    framed.push(LZMA_VERSION_MAJOR);
    framed.push(LZMA_VERSION_MINOR);
    framed.extend_from_slice(&(LZMA_PROPS_SIZE as u16).to_le_bytes());
    framed.extend_from_slice(&raw[..LZMA_PROPS_SIZE]);
    framed.extend_from_slice(&raw[LZMA_ALONE_HEADER_SIZE..]);
    Ok(framed)
}

/// Decompress a ZIP-framed LZMA payload.
///
/// The decoder must consume the whole payload and produce exactly
/// `uncompressed_size` bytes for the call to succeed.
pub fn decompress(data: &[u8], uncompressed_size: u32) -> XzipResult<Vec<u8>> {
    if data.len() < ZIP_LZMA_HEADER_SIZE {
        return Err(XzipError::DecompressionFailed(
            "payload too short for the ZIP LZMA framing".into(),
        ));
    }
    let props_size = u16::from_le_bytes([data[2], data[3]]) as usize;
    if props_size != LZMA_PROPS_SIZE {
        return Err(XzipError::DecompressionFailed(format!(
            "unexpected LZMA properties size {props_size}"
        )));
    }

    // Properties directly precede the stream in the framed payload, so
    // the tail of the input is already a headerless LZMA-alone stream.
    let mut input = &data[4..];
    let mut output = Vec::with_capacity(uncompressed_size as usize);
    let options = lzma_rs::decompress::Options {
        unpacked_size: lzma_rs::decompress::UnpackedSize::UseProvided(Some(
            uncompressed_size as u64,
        )),
        ..Default::default()
    };
    lzma_rs::lzma_decompress_with_options(&mut input, &mut output, &options)
        .map_err(|e| XzipError::DecompressionFailed(e.to_string()))?;

    if output.len() != uncompressed_size as usize {
        return Err(XzipError::DecompressionFailed(format!(
            "expected {} bytes, decoder produced {}",
            uncompressed_size,
            output.len()
        )));
    }
    Ok(output)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let data: Vec<u8> = (0..4096u32).flat_map(|i| (i % 251).to_le_bytes()).collect();
        let framed = compress(&data).unwrap();
        let restored = decompress(&framed, data.len() as u32).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn framing_layout() {
        let framed = compress(b"payload bytes").unwrap();
        assert!(framed.len() >= ZIP_LZMA_HEADER_SIZE);
        // properties size is 5, little-endian, regardless of archive endian
        assert_eq!(&framed[2..4], &[0x05, 0x00]);
    }

    #[test]
    fn wrong_size_is_rejected() {
        let framed = compress(b"some reasonably long test input").unwrap();
        assert!(decompress(&framed, 5).is_err());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        assert!(decompress(&[9, 20, 5], 10).is_err());
    }
}
