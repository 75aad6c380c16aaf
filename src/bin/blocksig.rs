//! blocksig - write the block signature of a file.
//!
//! ```text
//! blocksig <source> <destination> [blocksize_mb]
//! blocksig --print <signature>
//! ```

use std::fs;
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blocksig::{HashAlgorithm, SignatureConfig, Signer, hash};

/// Computes a per-block digest signature of a file.
#[derive(Parser)]
#[command(name = "blocksig")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to an input file to make a signature for
    source: PathBuf,

    /// Path to an output file to write the signature to
    #[arg(required_unless_present = "print")]
    destination: Option<PathBuf>,

    /// Block size in megabytes which a digest is calculated for
    #[arg(default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    blocksize_mb: u64,

    /// Number of worker threads (defaults to the available parallelism)
    #[arg(short, long)]
    threads: Option<NonZeroUsize>,

    /// Digest computed for every block
    #[arg(long, default_value = "md5")]
    hash: HashAlgorithm,

    /// Print SOURCE as a signature file, one hex digest per line
    #[arg(long, conflicts_with = "destination")]
    print: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "blocksig=info",
        1 => "blocksig=debug",
        _ => "blocksig=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    if cli.print {
        return print_signature(cli);
    }

    let destination = cli
        .destination
        .as_ref()
        .context("missing destination path")?;
    let threads = match cli.threads {
        Some(threads) => threads.get(),
        None => std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(blocksig::DEFAULT_THREADS),
    };
    let block_size_mb = usize::try_from(cli.blocksize_mb).context("block size is too large")?;
    let config = SignatureConfig::from_megabytes(block_size_mb, threads)?;

    let stats = Signer::open(&cli.source, config)?
        .run(destination, cli.hash.processor())
        .with_context(|| format!("making a signature of {}", cli.source.display()))?;

    tracing::info!(hash = %cli.hash, "{stats}");
    Ok(())
}

fn print_signature(cli: &Cli) -> Result<()> {
    let signature =
        fs::read(&cli.source).with_context(|| format!("reading {}", cli.source.display()))?;
    let digest_len = cli.hash.digest_len();
    if signature.len() % digest_len != 0 {
        tracing::warn!(
            len = signature.len(),
            digest_len,
            "signature length is not a multiple of the digest length"
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in hash::signature_lines(&signature, digest_len) {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}
