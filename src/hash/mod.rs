//! Built-in block processors.
//!
//! - [`Md5Processor`] - 16-byte MD5 digest per block (requires `hash-md5`)
//! - [`Blake3Processor`] - 32-byte BLAKE3 digest per block (requires `hash-blake3`)
//!
//! Plus helpers to render a signature stream as hex, one digest per line.

#[cfg(feature = "hash-blake3")]
mod blake3;
#[cfg(feature = "hash-md5")]
mod md5;

#[cfg(feature = "hash-blake3")]
pub use self::blake3::{BLAKE3_DIGEST_LEN, Blake3Processor};
#[cfg(feature = "hash-md5")]
pub use self::md5::{MD5_DIGEST_LEN, Md5Processor};

use std::fmt;
use std::str::FromStr;

use crate::processor::BlockProcessor;

/// Digest algorithms available as block processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5, 16 bytes per block.
    #[cfg(feature = "hash-md5")]
    Md5,
    /// BLAKE3, 32 bytes per block.
    #[cfg(feature = "hash-blake3")]
    Blake3,
}

impl HashAlgorithm {
    /// Returns the digest length written per block.
    pub fn digest_len(self) -> usize {
        match self {
            #[cfg(feature = "hash-md5")]
            HashAlgorithm::Md5 => MD5_DIGEST_LEN,
            #[cfg(feature = "hash-blake3")]
            HashAlgorithm::Blake3 => BLAKE3_DIGEST_LEN,
        }
    }

    /// Returns a processor computing this digest.
    pub fn processor(self) -> Box<dyn BlockProcessor> {
        match self {
            #[cfg(feature = "hash-md5")]
            HashAlgorithm::Md5 => Box::new(Md5Processor),
            #[cfg(feature = "hash-blake3")]
            HashAlgorithm::Blake3 => Box::new(Blake3Processor::new()),
        }
    }

    /// Returns the lowercase algorithm name.
    pub fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "hash-md5")]
            HashAlgorithm::Md5 => "md5",
            #[cfg(feature = "hash-blake3")]
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            #[cfg(feature = "hash-md5")]
            "md5" => Ok(HashAlgorithm::Md5),
            #[cfg(feature = "hash-blake3")]
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(format!("unknown hash algorithm: {other}")),
        }
    }
}

/// Encodes bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut result = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        result.push(HEX[(byte >> 4) as usize] as char);
        result.push(HEX[(byte & 0xf) as usize] as char);
    }
    result
}

/// Splits a signature stream into hex lines of `digest_len` bytes each.
///
/// A trailing fragment shorter than `digest_len` is ignored.
///
/// # Example
///
/// ```
/// use blocksig::hash::signature_lines;
///
/// let lines: Vec<_> = signature_lines(&[0xab, 0xcd, 0x01, 0x02], 2).collect();
/// assert_eq!(lines, ["abcd", "0102"]);
/// ```
pub fn signature_lines(signature: &[u8], digest_len: usize) -> impl Iterator<Item = String> + '_ {
    signature
        .chunks_exact(digest_len.max(1))
        .map(to_hex)
}
