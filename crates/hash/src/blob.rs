//! Canonical wire encoding for stored blobs: `base64(gzip(bytes))`.
//!
//! The object store only ever needs whole-buffer encode/decode, so this
//! module exposes a simple byte-in byte-out pair rather than a streaming
//! `Read`/`Write` adapter.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::BlobCodecError;

/// Gzips `bytes` and wraps the result in standard base64.
pub fn encode(bytes: &[u8]) -> String {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(bytes).expect("writing to an in-memory buffer cannot fail");
    let compressed = gz.finish().expect("finishing an in-memory gzip stream cannot fail");
    BASE64.encode(compressed)
}

/// Reverses [`encode`], validating both the base64 envelope and the gzip
/// stream it contains.
pub fn decode(text: &str) -> Result<Vec<u8>, BlobCodecError> {
    let compressed = BASE64.decode(text)?;
    let mut decoder = GzDecoder::new(&compressed[..]);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(BlobCodecError::Gzip)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let original = b"the quick brown fox jumps over the lazy dog\n".repeat(100);
        let encoded = encode(&original);
        assert_eq!(decode(&encoded).unwrap(), original);
    }

    #[test]
    fn round_trips_empty_input() {
        let encoded = encode(b"");
        assert_eq!(decode(&encoded).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_corrupt_base64() {
        assert!(matches!(decode("not base64!!"), Err(BlobCodecError::Base64(_))));
    }

    #[test]
    fn rejects_base64_that_is_not_gzip() {
        let text = BASE64.encode(b"plain bytes, not a gzip stream");
        assert!(matches!(decode(&text), Err(BlobCodecError::Gzip(_))));
    }
}
