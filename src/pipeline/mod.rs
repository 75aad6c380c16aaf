//! Ordered block pipeline.
//!
//! [`Pipeline`] drives a whole signature run over any reader and writer:
//!
//! - the caller's thread reads whole blocks into a bounded
//!   [`BlockArena`](crate::BlockArena) and submits one job per block to a
//!   [`WorkerPool`](crate::WorkerPool)
//! - a writer thread waits for block `0`, then `1`, then `2`, ... and writes
//!   each result as soon as it is its turn, releasing the block's cell
//! - a trailing partial block is processed last on the caller's thread
//!
//! Output order is block order no matter which worker finishes first.
//! Intake can run at most `arena_capacity` blocks ahead of the writer, which
//! is the only thing bounding memory.
//!
//! # Example
//!
//! ```
//! use blocksig::{Pipeline, SignatureConfig, from_fn};
//! use std::io::Cursor;
//!
//! let pipeline = Pipeline::new(SignatureConfig::new(4, 2)?)?;
//! let input = b"abcdefghij";
//! let mut output = Vec::new();
//!
//! let stats = pipeline.run(
//!     &mut Cursor::new(&input[..]),
//!     input.len() as u64,
//!     &mut output,
//!     from_fn(|block| Ok(block.iter().rev().copied().collect())),
//! )?;
//!
//! assert_eq!(output, b"dcbahgfeji");
//! assert_eq!(stats.blocks, 3);
//! # Ok::<(), blocksig::SigError>(())
//! ```

mod state;

use std::fmt;
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::buffer::BlockArena;
use crate::config::{BlockPlan, SignatureConfig};
use crate::error::{JobFailure, SigError};
use crate::pool::WorkerPool;
use crate::processor::BlockProcessor;

use state::RunState;

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Blocks processed, trailing block included.
    pub blocks: u64,
    /// Length of the trailing block, 0 if there was none.
    pub trailing_len: usize,
    /// Input bytes consumed.
    pub bytes_read: u64,
    /// Signature bytes written.
    pub bytes_written: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blocks, {} bytes in, {} bytes out, {} ms",
            self.blocks,
            self.bytes_read,
            self.bytes_written,
            self.elapsed.as_millis()
        )
    }
}

/// Runs block processors concurrently and writes their results in order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: SignatureConfig,
}

impl Pipeline {
    /// Creates a pipeline after validating `config`.
    pub fn new(config: SignatureConfig) -> Result<Self, SigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SignatureConfig {
        &self.config
    }

    /// Processes `input_len` bytes of `reader` and writes the signature to
    /// `writer`.
    ///
    /// `reader` must yield at least `input_len` bytes. Any error aborts the
    /// run; bytes already written to `writer` are left as they are.
    pub fn run<R, W, P>(
        &self,
        reader: &mut R,
        input_len: u64,
        writer: &mut W,
        processor: P,
    ) -> Result<RunStats, SigError>
    where
        R: Read + ?Sized,
        W: Write + Send + ?Sized,
        P: BlockProcessor + 'static,
    {
        let started = Instant::now();
        let plan = BlockPlan::new(input_len, self.config.block_size())?;
        let span = tracing::info_span!(
            "signature",
            blocks = plan.total_blocks(),
            block_size = plan.block_size
        );
        let _enter = span.enter();
        tracing::info!(
            threads = self.config.threads(),
            arena_capacity = self.config.arena_capacity(),
            "starting signature run"
        );

        let result = self.run_plan(reader, &plan, writer, Arc::new(processor));
        match result {
            Ok(bytes_written) => {
                let stats = RunStats {
                    blocks: plan.total_blocks(),
                    trailing_len: plan.trailing_len,
                    bytes_read: plan.input_len(),
                    bytes_written,
                    elapsed: started.elapsed(),
                };
                tracing::info!(
                    bytes_written,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "signature complete"
                );
                Ok(stats)
            }
            Err(e) => {
                tracing::warn!(error = %e, "signature run aborted");
                Err(e)
            }
        }
    }

    fn run_plan<R, W, P>(
        &self,
        reader: &mut R,
        plan: &BlockPlan,
        writer: &mut W,
        processor: Arc<P>,
    ) -> Result<u64, SigError>
    where
        R: Read + ?Sized,
        W: Write + Send + ?Sized,
        P: BlockProcessor + 'static,
    {
        let mut written = 0;

        if plan.complete_blocks > 0 {
            let arena = BlockArena::new(self.config.arena_capacity(), plan.block_size)?;
            let pool = WorkerPool::new(self.config.threads(), self.config.queue_capacity())?;
            let state = RunState::new(arena);

            written = thread::scope(|scope| -> Result<u64, SigError> {
                let out = &mut *writer;
                let state = &state;
                let blocks = plan.complete_blocks;
                let writer_thread = thread::Builder::new()
                    .name("blocksig-writer".into())
                    .spawn_scoped(scope, move || {
                        let drained =
                            panic::catch_unwind(AssertUnwindSafe(|| state.drain(blocks, out)))
                                .unwrap_or(Err(SigError::WriterPanicked));
                        if drained.is_err() {
                            state.abort();
                        }
                        drained
                    })
                    .map_err(SigError::Spawn)?;

                let intake = intake(state, &pool, &processor, &mut *reader, blocks);
                if intake.is_err() {
                    state.abort();
                }
                pool.shutdown();

                let drained = writer_thread
                    .join()
                    .unwrap_or(Err(SigError::WriterPanicked));
                let written = drained?;
                intake?;
                Ok(written)
            })?;
        }

        if plan.has_trailing() {
            let index = plan.complete_blocks;
            let mut tail = vec![0u8; plan.trailing_len];
            reader.read_exact(&mut tail).map_err(SigError::Read)?;
            let processed = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&tail)));
            let digest = match processed {
                Ok(Ok(digest)) => Ok(digest),
                Ok(Err(e)) => Err(JobFailure::Error(e)),
                Err(payload) => Err(JobFailure::from_panic(payload)),
            }
            .map_err(|source| SigError::Processing { index, source })?;
            writer.write_all(&digest).map_err(SigError::Write)?;
            written += digest.len() as u64;
            tracing::debug!(index, len = plan.trailing_len, "trailing block written");
        }

        writer.flush().map_err(SigError::Write)?;
        Ok(written)
    }
}

/// Reads blocks `0..blocks` and queues a processing job for each.
///
/// Returns early without error if the writer aborted the run.
fn intake<R, P>(
    state: &RunState,
    pool: &WorkerPool,
    processor: &Arc<P>,
    reader: &mut R,
    blocks: u64,
) -> Result<(), SigError>
where
    R: Read + ?Sized,
    P: BlockProcessor + 'static,
{
    for index in 0..blocks {
        let Some(view) = state.fill(index, &mut *reader)? else {
            tracing::debug!(index, "intake stopping, writer aborted");
            return Ok(());
        };

        let processor = Arc::clone(processor);
        let handle = pool.submit(move || {
            let digest = processor.process(&view);
            // the cell can only be refilled once every view is gone
            drop(view);
            digest.map(Bytes::from)
        })?;
        state.publish(index, handle);
        tracing::debug!(index, "block submitted");
    }
    Ok(())
}
