//! Bounded block storage.
//!
//! This module provides the fixed set of reusable cells that hold blocks
//! while they are in flight. Memory use is capped at
//! `capacity * block_size` regardless of input length.

mod arena;

pub use arena::{BlockArena, BlockView};
