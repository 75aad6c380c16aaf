//! MD5 block digests.

use ::md5::{Digest, Md5};

use crate::error::BoxError;
use crate::processor::BlockProcessor;

/// Length of an MD5 block digest in bytes.
pub const MD5_DIGEST_LEN: usize = 16;

/// Writes the 16-byte MD5 digest of every block.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Processor;

impl Md5Processor {
    /// Hashes `data` in one shot.
    pub fn digest(data: &[u8]) -> [u8; MD5_DIGEST_LEN] {
        Md5::digest(data).into()
    }
}

impl BlockProcessor for Md5Processor {
    fn process(&self, block: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(Self::digest(block).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::to_hex;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            to_hex(&Md5Processor::digest(b"")),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            to_hex(&Md5Processor::digest(b"abc")),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_process_len() {
        let digest = Md5Processor.process(&[0u8; 1024]).unwrap();
        assert_eq!(digest.len(), MD5_DIGEST_LEN);
    }
}
