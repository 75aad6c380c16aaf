//! Configuration for signature runs.
//!
//! - [`SignatureConfig`] - Block size and concurrency limits
//! - [`BlockPlan`] - How an input of a given length splits into blocks
//!
//! Concurrency is always explicit: nothing here looks at the host to pick a
//! thread count.
//!
//! # Example
//!
//! ```
//! use blocksig::SignatureConfig;
//!
//! let config = SignatureConfig::new(64 * 1024, 8)?
//!     .with_queue_capacity(16)
//!     .with_arena_capacity(12);
//! config.validate()?;
//! # Ok::<(), blocksig::SigError>(())
//! ```

use crate::error::SigError;

/// Number of bytes in one mebibyte.
pub const BYTES_IN_MB: usize = 1024 * 1024;

/// Default block size (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = BYTES_IN_MB;

/// Default number of worker threads.
pub const DEFAULT_THREADS: usize = 4;

/// Configuration for a signature run.
///
/// `queue_capacity` bounds how many submitted jobs may wait for a worker and
/// `arena_capacity` bounds how many blocks may be held in memory at once.
/// Both default to the thread count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureConfig {
    block_size: usize,
    threads: usize,
    queue_capacity: usize,
    arena_capacity: usize,
}

impl SignatureConfig {
    /// Creates a new configuration with queue and arena sized to `threads`.
    ///
    /// Returns error if `block_size` or `threads` is zero.
    pub fn new(block_size: usize, threads: usize) -> Result<Self, SigError> {
        let config = Self {
            block_size,
            threads,
            queue_capacity: threads,
            arena_capacity: threads,
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates a configuration from a block size given in mebibytes.
    ///
    /// # Example
    ///
    /// ```
    /// use blocksig::SignatureConfig;
    ///
    /// let config = SignatureConfig::from_megabytes(2, 4)?;
    /// assert_eq!(config.block_size(), 2 * 1024 * 1024);
    /// # Ok::<(), blocksig::SigError>(())
    /// ```
    pub fn from_megabytes(block_size_mb: usize, threads: usize) -> Result<Self, SigError> {
        let block_size = block_size_mb
            .checked_mul(BYTES_IN_MB)
            .ok_or(SigError::InvalidConfig {
                message: "block size in megabytes is too large",
            })?;
        Self::new(block_size, threads)
    }

    /// Sets the block size in bytes.
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the number of worker threads.
    ///
    /// Queue and arena capacities are left untouched.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets how many jobs may wait in the worker queue.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets how many blocks may be held in memory at once.
    pub fn with_arena_capacity(mut self, capacity: usize) -> Self {
        self.arena_capacity = capacity;
        self
    }

    /// Returns the block size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Returns the worker queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Returns the arena capacity in blocks.
    pub fn arena_capacity(&self) -> usize {
        self.arena_capacity
    }

    /// Upper bound on bytes held by the arena during a run.
    pub fn memory_bound(&self) -> usize {
        self.block_size.saturating_mul(self.arena_capacity)
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), SigError> {
        if self.block_size == 0 {
            return Err(SigError::InvalidConfig {
                message: "block size must be non-zero",
            });
        }
        if self.threads == 0 {
            return Err(SigError::InvalidConfig {
                message: "thread count must be at least 1",
            });
        }
        if self.queue_capacity == 0 {
            return Err(SigError::InvalidConfig {
                message: "queue capacity must be at least 1",
            });
        }
        if self.arena_capacity == 0 {
            return Err(SigError::InvalidConfig {
                message: "arena capacity must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            threads: DEFAULT_THREADS,
            queue_capacity: DEFAULT_THREADS,
            arena_capacity: DEFAULT_THREADS,
        }
    }
}

/// Split of an input into whole blocks and an optional trailing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPlan {
    /// Size of every whole block.
    pub block_size: usize,
    /// Number of whole blocks.
    pub complete_blocks: u64,
    /// Length of the trailing block, 0 if the input divides evenly.
    pub trailing_len: usize,
}

impl BlockPlan {
    /// Plans `input_len` bytes split into `block_size` blocks.
    ///
    /// # Example
    ///
    /// ```
    /// use blocksig::BlockPlan;
    ///
    /// let plan = BlockPlan::new(10, 4)?;
    /// assert_eq!(plan.complete_blocks, 2);
    /// assert_eq!(plan.trailing_len, 2);
    /// assert_eq!(plan.total_blocks(), 3);
    /// # Ok::<(), blocksig::SigError>(())
    /// ```
    pub fn new(input_len: u64, block_size: usize) -> Result<Self, SigError> {
        if block_size == 0 {
            return Err(SigError::InvalidConfig {
                message: "block size must be non-zero",
            });
        }
        let size = block_size as u64;
        Ok(Self {
            block_size,
            complete_blocks: input_len / size,
            // remainder is below block_size, so it fits in usize
            trailing_len: (input_len % size) as usize,
        })
    }

    /// Returns true if the input ends with a partial block.
    pub fn has_trailing(&self) -> bool {
        self.trailing_len != 0
    }

    /// Returns the number of blocks including the trailing one.
    pub fn total_blocks(&self) -> u64 {
        self.complete_blocks + u64::from(self.has_trailing())
    }

    /// Returns the input length this plan covers.
    pub fn input_len(&self) -> u64 {
        self.complete_blocks * self.block_size as u64 + self.trailing_len as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SignatureConfig::default();
        assert_eq!(config.block_size(), DEFAULT_BLOCK_SIZE);
        assert_eq!(config.threads(), DEFAULT_THREADS);
        assert_eq!(config.queue_capacity(), DEFAULT_THREADS);
        assert_eq!(config.arena_capacity(), DEFAULT_THREADS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = SignatureConfig::default()
            .with_block_size(4096)
            .with_threads(2)
            .with_queue_capacity(8)
            .with_arena_capacity(3);

        assert_eq!(config.block_size(), 4096);
        assert_eq!(config.threads(), 2);
        assert_eq!(config.queue_capacity(), 8);
        assert_eq!(config.arena_capacity(), 3);
        assert_eq!(config.memory_bound(), 3 * 4096);
    }

    #[test]
    fn test_new_sizes_queue_and_arena_to_threads() {
        let config = SignatureConfig::new(16, 6).unwrap();
        assert_eq!(config.queue_capacity(), 6);
        assert_eq!(config.arena_capacity(), 6);
    }

    #[test]
    fn test_invalid_config_zero() {
        assert!(SignatureConfig::new(0, 4).is_err());
        assert!(SignatureConfig::new(4096, 0).is_err());
        assert!(
            SignatureConfig::default()
                .with_queue_capacity(0)
                .validate()
                .is_err()
        );
        assert!(
            SignatureConfig::default()
                .with_arena_capacity(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_from_megabytes() {
        let config = SignatureConfig::from_megabytes(3, 1).unwrap();
        assert_eq!(config.block_size(), 3 * BYTES_IN_MB);
        assert!(SignatureConfig::from_megabytes(0, 1).is_err());
        assert!(SignatureConfig::from_megabytes(usize::MAX, 1).is_err());
    }

    #[test]
    fn test_block_plan() {
        let plan = BlockPlan::new(12, 4).unwrap();
        assert_eq!(plan.complete_blocks, 3);
        assert!(!plan.has_trailing());
        assert_eq!(plan.total_blocks(), 3);
        assert_eq!(plan.input_len(), 12);

        let plan = BlockPlan::new(3, 4).unwrap();
        assert_eq!(plan.complete_blocks, 0);
        assert_eq!(plan.trailing_len, 3);
        assert_eq!(plan.total_blocks(), 1);

        assert!(BlockPlan::new(10, 0).is_err());
    }
}
