//! The per-block transform plugged into a signature run.
//!
//! A [`BlockProcessor`] turns the bytes of one block into that block's
//! contribution to the signature. It is called from several worker threads
//! at once and in no particular order; only the order in which results are
//! written is fixed.

use std::sync::Arc;

use crate::error::BoxError;

/// Transforms one block into its signature bytes.
pub trait BlockProcessor: Send + Sync {
    /// Processes a single block.
    ///
    /// Every block except possibly the last has the configured block size.
    fn process(&self, block: &[u8]) -> Result<Vec<u8>, BoxError>;
}

impl<P: BlockProcessor + ?Sized> BlockProcessor for Box<P> {
    fn process(&self, block: &[u8]) -> Result<Vec<u8>, BoxError> {
        (**self).process(block)
    }
}

impl<P: BlockProcessor + ?Sized> BlockProcessor for Arc<P> {
    fn process(&self, block: &[u8]) -> Result<Vec<u8>, BoxError> {
        (**self).process(block)
    }
}

/// A [`BlockProcessor`] backed by a closure. Built with [`from_fn`].
#[derive(Clone)]
pub struct FnProcessor<F> {
    f: F,
}

/// Wraps a closure as a [`BlockProcessor`].
///
/// # Example
///
/// ```
/// use blocksig::{BlockProcessor, from_fn};
///
/// let reverse = from_fn(|block| Ok(block.iter().rev().copied().collect()));
/// assert_eq!(reverse.process(b"abc").unwrap(), b"cba");
/// ```
pub fn from_fn<F>(f: F) -> FnProcessor<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    FnProcessor { f }
}

impl<F> BlockProcessor for FnProcessor<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>, BoxError> + Send + Sync,
{
    fn process(&self, block: &[u8]) -> Result<Vec<u8>, BoxError> {
        (self.f)(block)
    }
}

impl<F> std::fmt::Debug for FnProcessor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnProcessor")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn() {
        let len = from_fn(|block| Ok(vec![block.len() as u8]));
        assert_eq!(len.process(&[0u8; 7]).unwrap(), vec![7]);
    }

    #[test]
    fn test_boxed_and_shared() {
        let boxed: Box<dyn BlockProcessor> = Box::new(from_fn(|block| Ok(block.to_vec())));
        assert_eq!(boxed.process(b"xy").unwrap(), b"xy");

        let shared = Arc::new(boxed);
        assert_eq!(shared.process(b"z").unwrap(), b"z");
    }

    #[test]
    fn test_error_passthrough() {
        let failing = from_fn(|_| Err("nope".into()));
        assert_eq!(failing.process(b"").unwrap_err().to_string(), "nope");
    }
}
