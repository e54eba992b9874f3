use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

/// Hex characters shown per entry in listing mode.
pub const LISTING_PREFIX_LEN: usize = 12;
/// Hex characters shown per member in duplicate reports.
pub const REPORT_PREFIX_LEN: usize = 15;

/// One hashed file: the path as it was reached and its hex digest.
///
/// Entries are never mutated after creation; they move from the walker
/// through the channel to whichever aggregator consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    path: PathBuf,
    hash: String,
}

impl FileEntry {
    pub fn new(path: PathBuf, hash: String) -> Self {
        Self { path, hash }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full lowercase hex digest.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Leading `len` hex characters of the digest, for display only.
    pub fn hash_prefix(&self, len: usize) -> &str {
        hash_prefix(&self.hash, len)
    }

    pub fn into_parts(self) -> (PathBuf, String) {
        (self.path, self.hash)
    }
}

/// Truncate a hex digest for display. Never used for comparisons.
pub fn hash_prefix(hash: &str, len: usize) -> &str {
    let mut end = len.min(hash.len());
    while !hash.is_char_boundary(end) {
        end -= 1;
    }
    &hash[..end]
}

pub fn format_human_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    if secs >= 3600 {
        let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        format!("{hours}:{minutes:02}:{seconds:02}.{millis:03} (h:mm:ss.mmm)")
    } else if secs >= 60 {
        let (minutes, seconds) = (secs / 60, secs % 60);
        format!("{minutes}:{seconds:02}.{millis:03} (m:ss.mmm)")
    } else {
        format!("{secs}.{millis:03} seconds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_prefix_truncates() {
        let entry = FileEntry::new(PathBuf::from("x.bin"), "0123456789abcdef".repeat(4));
        assert_eq!(entry.hash_prefix(LISTING_PREFIX_LEN), "0123456789ab");
        assert_eq!(entry.hash_prefix(REPORT_PREFIX_LEN), "0123456789abcde");
        assert_eq!(entry.hash().len(), 64);
    }

    #[test]
    fn test_hash_prefix_short_hash() {
        assert_eq!(hash_prefix("abc", 12), "abc");
    }

    #[test]
    fn test_hash_prefix_never_splits_a_char() {
        // 'é' is two bytes: 11 ASCII chars then a char straddling byte 12
        let entry = FileEntry::new(PathBuf::from("odd"), format!("{}é{}", "a".repeat(11), "b".repeat(10)));
        assert_eq!(entry.hash_prefix(LISTING_PREFIX_LEN), "a".repeat(11));
        assert_eq!(hash_prefix("ééé", 3), "é");
    }

    #[test]
    fn test_format_human_elapsed() {
        assert_eq!(format_human_elapsed(Duration::from_millis(1500)), "1.500 seconds");
        assert_eq!(
            format_human_elapsed(Duration::from_millis(61_007)),
            "1:01.007 (m:ss.mmm)"
        );
        assert_eq!(
            format_human_elapsed(Duration::from_secs(3723)),
            "1:02:03.000 (h:mm:ss.mmm)"
        );
    }
}
