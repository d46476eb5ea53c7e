//! `GZIP`, the only defined compressor. Kept behind a trait so a second
//! compressor can be slotted in later without touching callers.

use crate::error::Result;
use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use std::io::Read;

pub trait Compressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub struct Gzip;

impl Compressor for Gzip {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(data, Compression::default());
        let mut out = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    fn uncompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress_uncompress_round_trips() {
        let gzip = Gzip;
        let original = b"the quick brown fox jumps over the lazy dog".repeat(64);
        let compressed = gzip.compress(&original).unwrap();
        assert!(compressed.len() < original.len());
        let restored = gzip.uncompress(&compressed).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn empty_payload_round_trips() {
        let gzip = Gzip;
        let compressed = gzip.compress(&[]).unwrap();
        let restored = gzip.uncompress(&compressed).unwrap();
        assert!(restored.is_empty());
    }
}
