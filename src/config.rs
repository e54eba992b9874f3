use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::Deserialize;

use crate::cli::Cli;
use crate::digest::DigestAlgorithm;
use crate::scanner::{DEFAULT_CHANNEL_CAPACITY, Traversal, WalkOptions};

/// Looked up in the current directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "treehash.toml";

/// Optional settings read from a TOML file.
///
/// ```toml
/// traversal = "sequential"
/// algorithm = "blake3"
/// threads = 4
/// channel_capacity = "unbounded"   # or an integer, 0 for hand-off
/// json = false
/// color = true
/// log_level = "warn"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub traversal: Option<Traversal>,
    pub algorithm: Option<DigestAlgorithm>,
    pub threads: Option<usize>,
    pub channel_capacity: Option<ChannelCapacity>,
    pub json: Option<bool>,
    pub color: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChannelCapacity {
    Bounded(usize),
    Unbounded(UnboundedKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnboundedKeyword {
    Unbounded,
}

impl ChannelCapacity {
    fn bound(self) -> Option<usize> {
        match self {
            Self::Bounded(n) => Some(n),
            Self::Unbounded(_) => None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: '{}'", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: '{}'", path.display()))
    }

    /// Load `explicit` if given (it must exist), else the default file if it
    /// exists, else an empty config.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// What the aggregator does with the entry stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print every entry as it arrives.
    Listing,
    /// Drain everything, then print groups of identical files.
    Duplicates,
}

/// Fully resolved run settings: defaults < config file < command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mode: Mode,
    pub files: bool,
    pub walk: WalkOptions,
    pub json: bool,
    pub color: bool,
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: Config) -> Result<Self> {
        let traversal = if cli.sequential {
            Traversal::Sequential
        } else {
            cli.traversal.or(config.traversal).unwrap_or_default()
        };

        let channel_capacity = if cli.unbounded {
            None
        } else if let Some(n) = cli.channel_capacity {
            Some(n)
        } else {
            config
                .channel_capacity
                .map_or(Some(DEFAULT_CHANNEL_CAPACITY), ChannelCapacity::bound)
        };

        let log_level = if cli.verbose {
            LevelFilter::Debug
        } else if cli.quiet {
            LevelFilter::Error
        } else {
            match config.log_level.as_deref() {
                Some(level) => level
                    .parse()
                    .map_err(|_| anyhow!("Invalid log_level in config: '{level}'"))?,
                None => LevelFilter::Info,
            }
        };

        Ok(Self {
            mode: if cli.duplicates { Mode::Duplicates } else { Mode::Listing },
            files: cli.files,
            walk: WalkOptions {
                algorithm: cli.algorithm.or(config.algorithm).unwrap_or_default(),
                traversal,
                threads: cli.threads.or(config.threads),
                channel_capacity,
            },
            json: cli.json || config.json.unwrap_or(false),
            color: cli.color || config.color.unwrap_or(false),
            log_level,
        })
    }
}
