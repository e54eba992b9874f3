pub mod cli;
pub mod config;
pub mod digest;
pub mod duplicates;
pub mod error;
pub mod hasher;
pub mod listing;
pub mod scanner;
pub mod utils;

pub use cli::Cli;
pub use config::{Config, Mode, Settings};
pub use digest::DigestAlgorithm;
pub use duplicates::{DigestGroups, DuplicateGroup, find_duplicates, write_report, write_report_json};
pub use error::WalkError;
pub use hasher::hash_file;
pub use listing::stream_listing;
pub use scanner::{
    EntrySender, Traversal, WalkHandle, WalkOptions, WalkSummary, Walker, entry_channel, spawn_hash_files,
    spawn_walk,
};
pub use utils::{FileEntry, format_human_elapsed};
