use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use crate::digest::DigestAlgorithm;
use crate::scanner::Traversal;

#[derive(Parser, Debug)]
#[command(name = "treehash", version)]
#[command(about = "Hash every file under a path and report files with identical content")]
pub struct Cli {
    /// File or directory to hash (one or more files with --files)
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Report groups of identical files instead of listing every hash
    #[arg(short, long)]
    pub duplicates: bool,

    /// Hash each PATH as a file, without recursing
    #[arg(short, long)]
    pub files: bool,

    /// Visit directory entries one at a time (same as --traversal sequential)
    #[arg(short, long, conflicts_with = "traversal")]
    pub sequential: bool,

    /// Directory traversal strategy
    #[arg(long, value_enum)]
    pub traversal: Option<Traversal>,

    /// Number of hashing threads for concurrent traversal (default: number of CPU cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Entries buffered between the walker and the report (0 = hand-off)
    #[arg(long, value_name = "N", conflicts_with = "unbounded")]
    pub channel_capacity: Option<usize>,

    /// Never block the walker on a slow report
    #[arg(long)]
    pub unbounded: bool,

    /// Digest algorithm
    #[arg(short, long, value_enum)]
    pub algorithm: Option<DigestAlgorithm>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Colorize hashes and headers when stdout is a terminal
    #[arg(long)]
    pub color: bool,

    /// Config file (default: ./treehash.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse `std::env::args`, exiting with usage on bad arguments.
    pub fn parse_args() -> Self {
        let cli = Self::parse();
        if let Err(message) = cli.validate() {
            Self::command().error(ErrorKind::WrongNumberOfValues, message).exit();
        }
        cli
    }

    /// Tree mode takes exactly one root; only `--files` accepts several.
    pub fn validate(&self) -> Result<(), String> {
        if !self.files && self.paths.len() != 1 {
            return Err(format!(
                "expected one file or directory to hash, got {}; use --files to hash several files",
                self.paths.len()
            ));
        }
        Ok(())
    }
}
