//! blocksig
//!
//! Fixed-size block signatures for large files.
//!
//! `blocksig` splits an input into blocks of a fixed size, runs a
//! [`BlockProcessor`] (typically a hash) over every block on a pool of worker
//! threads, and writes the per-block results back to back, in block order.
//! It is meant for:
//!
//! - file signatures for change detection
//! - block-level integrity manifests
//! - any per-block transform over inputs far larger than memory
//!
//! Memory stays bounded no matter the input size: at most `arena_capacity`
//! blocks are held at once, and the reader waits for the writer when they
//! are all in use.
//!
//! The crate intentionally:
//! - does NOT do content-defined chunking (blocks are fixed-size)
//! - does NOT distribute work beyond one process
//! - does NOT checkpoint or resume runs
//! - does NOT install a logging subscriber (it only emits `tracing` events)
//!
//! # Files
//!
//! ```no_run
//! use blocksig::{Md5Processor, SignatureConfig, Signer, SigError};
//!
//! fn main() -> Result<(), SigError> {
//!     let config = SignatureConfig::new(1024 * 1024, 8)?;
//!     let stats = Signer::open("data.bin", config)?.run("data.sig", Md5Processor)?;
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```
//!
//! # Streams
//!
//! ```
//! use blocksig::{Pipeline, SignatureConfig, from_fn};
//! use std::io::Cursor;
//!
//! let data = vec![1u8; 100];
//! let mut signature = Vec::new();
//! Pipeline::new(SignatureConfig::new(16, 4)?)?.run(
//!     &mut Cursor::new(&data),
//!     data.len() as u64,
//!     &mut signature,
//!     from_fn(|block| Ok(vec![block.iter().fold(0u8, |a, b| a.wrapping_add(*b))])),
//! )?;
//! assert_eq!(signature.len(), 7);
//! # Ok::<(), blocksig::SigError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod error;
mod pipeline;
mod pool;
mod processor;
mod signer;

pub mod hash;

//
// Public surface
//

pub use buffer::{BlockArena, BlockView};
pub use config::{BYTES_IN_MB, BlockPlan, DEFAULT_BLOCK_SIZE, DEFAULT_THREADS, SignatureConfig};
pub use error::{BoxError, JobFailure, Result, SigError};
pub use pipeline::{Pipeline, RunStats};
pub use pool::{JobHandle, JobOutcome, WorkerPool};
pub use processor::{BlockProcessor, FnProcessor, from_fn};
pub use signer::Signer;

#[cfg(feature = "hash-blake3")]
pub use hash::Blake3Processor;
pub use hash::HashAlgorithm;
#[cfg(feature = "hash-md5")]
pub use hash::Md5Processor;
