//! Error types for blocksig.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by a [`BlockProcessor`](crate::BlockProcessor).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = SigError> = std::result::Result<T, E>;

/// Errors that abort a signature run.
#[derive(Debug, Error)]
pub enum SigError {
    /// Invalid configuration parameter.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// The input file has zero length.
    #[error("input file {} is empty", .path.display())]
    EmptyInput {
        /// Path of the empty input.
        path: PathBuf,
    },

    /// No free cell was available although one was expected.
    #[error("block arena has no free cell for block {index}")]
    StorageOverflow {
        /// Block that could not be stored.
        index: u64,
    },

    /// A block index was viewed or released while not held by the arena.
    #[error("block {index} is not held by the arena")]
    UnknownBlock {
        /// The unmapped block index.
        index: u64,
    },

    /// The block processor failed for a block.
    #[error("processing block {index} failed")]
    Processing {
        /// Index of the failing block.
        index: u64,
        /// What went wrong inside the job.
        #[source]
        source: JobFailure,
    },

    /// Reading the input stream failed.
    #[error("read error: {0}")]
    Read(#[source] io::Error),

    /// Writing the output stream failed.
    #[error("write error: {0}")]
    Write(#[source] io::Error),

    /// A file operation failed.
    #[error("{}: {source}", .path.display())]
    Io {
        /// File the operation was performed on.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// A job was submitted after the worker pool was shut down.
    #[error("worker pool is shut down")]
    PoolClosed,

    /// A pipeline thread could not be started.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] io::Error),

    /// The writer thread panicked.
    #[error("writer thread panicked")]
    WriterPanicked,
}

impl SigError {
    /// Attaches `path` to stream I/O errors, turning them into [`SigError::Io`].
    pub(crate) fn at_path(self, input: &std::path::Path, output: &std::path::Path) -> Self {
        match self {
            SigError::Read(source) => SigError::Io {
                path: input.to_path_buf(),
                source,
            },
            SigError::Write(source) => SigError::Io {
                path: output.to_path_buf(),
                source,
            },
            other => other,
        }
    }

    /// Returns the block index this error refers to, if any.
    pub fn block_index(&self) -> Option<u64> {
        match self {
            SigError::StorageOverflow { index }
            | SigError::UnknownBlock { index }
            | SigError::Processing { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Why a job did not produce a result.
#[derive(Debug, Error)]
pub enum JobFailure {
    /// The job returned an error.
    #[error(transparent)]
    Error(BoxError),

    /// The job panicked.
    #[error("job panicked: {0}")]
    Panic(String),
}

impl JobFailure {
    /// Builds a failure from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        JobFailure::Panic(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_display() {
        let err = SigError::UnknownBlock { index: 7 };
        assert!(err.to_string().contains("block 7"));

        let err = SigError::EmptyInput {
            path: PathBuf::from("in.bin"),
        };
        assert!(err.to_string().contains("in.bin"));
    }

    #[test]
    fn test_at_path() {
        let input = Path::new("in.bin");
        let output = Path::new("out.sig");

        let err = SigError::Read(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        match err.at_path(input, output) {
            SigError::Io { path, .. } => assert_eq!(path, input),
            other => panic!("unexpected {other:?}"),
        }

        let err = SigError::Write(io::Error::other("disk full"));
        match err.at_path(input, output) {
            SigError::Io { path, source } => {
                assert_eq!(path, output);
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            SigError::PoolClosed.at_path(input, output),
            SigError::PoolClosed
        ));
    }

    #[test]
    fn test_block_index() {
        let err = SigError::Processing {
            index: 3,
            source: JobFailure::Panic("boom".into()),
        };
        assert_eq!(err.block_index(), Some(3));
        assert_eq!(SigError::PoolClosed.block_index(), None);
    }

    #[test]
    fn test_panic_payload() {
        let failure = JobFailure::from_panic(Box::new("static message"));
        assert_eq!(failure.to_string(), "job panicked: static message");

        let failure = JobFailure::from_panic(Box::new(String::from("owned")));
        assert_eq!(failure.to_string(), "job panicked: owned");

        let failure = JobFailure::from_panic(Box::new(42u32));
        assert!(matches!(failure, JobFailure::Panic(_)));
    }
}
