//! BLAKE3 block digests.

use crate::error::BoxError;
use crate::processor::BlockProcessor;

/// Length of a BLAKE3 block digest in bytes.
pub const BLAKE3_DIGEST_LEN: usize = 32;

/// Writes the 32-byte BLAKE3 hash of every block.
#[derive(Debug, Clone, Default)]
pub struct Blake3Processor {
    key: Option<[u8; 32]>,
}

impl Blake3Processor {
    /// Creates an unkeyed processor.
    pub fn new() -> Self {
        Self { key: None }
    }

    /// Creates a processor using BLAKE3's keyed mode.
    pub fn keyed(key: [u8; 32]) -> Self {
        Self { key: Some(key) }
    }

    /// Hashes `data` in one shot.
    pub fn digest(&self, data: &[u8]) -> [u8; BLAKE3_DIGEST_LEN] {
        match &self.key {
            Some(key) => blake3::keyed_hash(key, data).into(),
            None => blake3::hash(data).into(),
        }
    }
}

impl BlockProcessor for Blake3Processor {
    fn process(&self, block: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(self.digest(block).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash() {
        let hasher = Blake3Processor::new();
        let hash = hasher.process(b"hello world").unwrap();
        assert_eq!(hash.len(), BLAKE3_DIGEST_LEN);

        // Hash should be deterministic
        assert_eq!(hash, hasher.process(b"hello world").unwrap());

        // Different data should give different hash
        assert_ne!(hash, hasher.process(b"hello world!").unwrap());
    }

    #[test]
    fn test_matches_reference() {
        let hash = Blake3Processor::new().process(b"abc").unwrap();
        assert_eq!(hash.as_slice(), blake3::hash(b"abc").as_bytes());
    }

    #[test]
    fn test_keyed_differs() {
        let plain = Blake3Processor::new().digest(b"block");
        let keyed = Blake3Processor::keyed([7u8; 32]).digest(b"block");
        assert_ne!(plain, keyed);
    }
}
