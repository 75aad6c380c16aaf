//! File-to-file signatures.
//!
//! [`Signer`] sizes an input file up front and runs a [`Pipeline`] from it
//! into a freshly truncated output file.
//!
//! # Example
//!
//! ```no_run
//! use blocksig::{Md5Processor, SignatureConfig, Signer};
//!
//! let signer = Signer::open("data.bin", SignatureConfig::default())?;
//! let stats = signer.run("data.sig", Md5Processor)?;
//! println!("{stats}");
//! # Ok::<(), blocksig::SigError>(())
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::config::{BlockPlan, SignatureConfig};
use crate::error::SigError;
use crate::pipeline::{Pipeline, RunStats};
use crate::processor::BlockProcessor;

/// Computes the signature of one input file.
///
/// A `Signer` is consumed by [`run`](Signer::run), so each instance performs
/// exactly one run.
#[derive(Debug)]
pub struct Signer {
    input_path: PathBuf,
    input_len: u64,
    plan: BlockPlan,
    pipeline: Pipeline,
}

impl Signer {
    /// Prepares a run over `input_path`.
    ///
    /// Fails with [`SigError::EmptyInput`] if the file has zero length.
    pub fn open(input_path: impl AsRef<Path>, config: SignatureConfig) -> Result<Self, SigError> {
        let input_path = input_path.as_ref().to_path_buf();
        let pipeline = Pipeline::new(config)?;

        let input_len = fs::metadata(&input_path)
            .map_err(|source| SigError::Io {
                path: input_path.clone(),
                source,
            })?
            .len();
        if input_len == 0 {
            return Err(SigError::EmptyInput { path: input_path });
        }

        let plan = BlockPlan::new(input_len, config.block_size())?;
        tracing::debug!(
            path = %input_path.display(),
            input_len,
            complete_blocks = plan.complete_blocks,
            trailing_len = plan.trailing_len,
            "input sized"
        );

        Ok(Self {
            input_path,
            input_len,
            plan,
            pipeline,
        })
    }

    /// Returns the input path.
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Returns the input length measured by [`open`](Signer::open).
    pub fn input_len(&self) -> u64 {
        self.input_len
    }

    /// Returns how the input splits into blocks.
    pub fn plan(&self) -> &BlockPlan {
        &self.plan
    }

    /// Writes the signature of the input to `output_path`.
    ///
    /// The output is created or truncated. On failure it may hold the
    /// results of the blocks written before the error.
    pub fn run<P>(self, output_path: impl AsRef<Path>, processor: P) -> Result<RunStats, SigError>
    where
        P: BlockProcessor + 'static,
    {
        let output_path = output_path.as_ref();
        let input = File::open(&self.input_path).map_err(|source| SigError::Io {
            path: self.input_path.clone(),
            source,
        })?;
        let output = File::create(output_path).map_err(|source| SigError::Io {
            path: output_path.to_path_buf(),
            source,
        })?;

        let block_size = self.plan.block_size;
        let mut reader = BufReader::with_capacity(block_size.min(1 << 20), input);
        let mut writer = BufWriter::new(output);

        self.pipeline
            .run(&mut reader, self.input_len, &mut writer, processor)
            .and_then(|stats| {
                let file = writer
                    .into_inner()
                    .map_err(|e| SigError::Write(e.into_error()))?;
                file.sync_all().map_err(SigError::Write)?;
                Ok(stats)
            })
            .map_err(|e| e.at_path(&self.input_path, output_path))
    }
}
