use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a walk.
///
/// Every variant is fatal: the walker never skips a path it could not stat,
/// list, open or read. Each carries the path that failed so the message the
/// user finally sees names it.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The path does not exist or could not be stat'ed.
    #[error("failed to stat '{}'", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A directory (or one of its entries) could not be listed.
    #[error("failed to list directory '{}'", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A regular file could not be opened for reading.
    #[error("failed to open file '{}'", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file was opened but reading its contents failed.
    #[error("failed to read file '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The consumer dropped its end of the channel before this entry was sent.
    #[error("output channel closed before '{}' could be published", path.display())]
    ChannelClosed { path: PathBuf },
}

impl WalkError {
    /// The path the failure refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Stat { path, .. }
            | Self::ReadDir { path, .. }
            | Self::Open { path, .. }
            | Self::Read { path, .. }
            | Self::ChannelClosed { path } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_path() {
        let err = WalkError::Stat {
            path: PathBuf::from("/missing/dir"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/missing/dir"));
        assert_eq!(err.path(), std::path::Path::new("/missing/dir"));
    }

    #[test]
    fn test_read_error_keeps_source() {
        let err = WalkError::Read {
            path: PathBuf::from("a.bin"),
            source: io::Error::other("disk on fire"),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk on fire"));
    }
}
