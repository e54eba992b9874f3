use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use colored::Colorize;
use indicatif::HumanCount;
use log::info;
use serde::Serialize;

use crate::utils::{FileEntry, REPORT_PREFIX_LEN, hash_prefix};

pub const DUPLICATE_HEADER: &str = "Duplicate Files Detected";

/// Paths keyed by their full digest.
///
/// Built one entry at a time while the channel drains; arrival order does
/// not matter because every path lands under its own digest.
#[derive(Debug, Default)]
pub struct DigestGroups {
    groups: HashMap<String, Vec<PathBuf>>,
    entries: usize,
}

/// Two or more paths with identical content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub hash: String,
    pub paths: Vec<PathBuf>,
}

impl DigestGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: FileEntry) {
        let (path, hash) = entry.into_parts();
        self.groups.entry(hash).or_default().push(path);
        self.entries += 1;
    }

    /// Number of entries consumed so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Distinct digests seen.
    pub fn unique_hashes(&self) -> usize {
        self.groups.len()
    }

    /// Groups with at least two members, ordered by digest, members by path.
    pub fn into_duplicates(self) -> Vec<DuplicateGroup> {
        let unique = self.groups.len();
        let mut duplicates: Vec<DuplicateGroup> = self
            .groups
            .into_iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(hash, mut paths)| {
                paths.sort();
                DuplicateGroup { hash, paths }
            })
            .collect();
        duplicates.sort_by(|a, b| a.hash.cmp(&b.hash));

        let redundant: usize = duplicates.iter().map(|g| g.paths.len() - 1).sum();
        info!(
            "Duplicate analysis complete: {} files, {} unique hashes, {} duplicate groups, {} redundant files",
            HumanCount(self.entries as u64),
            HumanCount(unique as u64),
            HumanCount(duplicates.len() as u64),
            HumanCount(redundant as u64)
        );
        duplicates
    }
}

impl Extend<FileEntry> for DigestGroups {
    fn extend<I: IntoIterator<Item = FileEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

impl FromIterator<FileEntry> for DigestGroups {
    fn from_iter<I: IntoIterator<Item = FileEntry>>(iter: I) -> Self {
        let mut groups = Self::new();
        groups.extend(iter);
        groups
    }
}

/// Group a complete set of entries and keep only the duplicates.
pub fn find_duplicates<I>(entries: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = FileEntry>,
{
    entries.into_iter().collect::<DigestGroups>().into_duplicates()
}

/// Write the text report: a header per group, one tab-indented line per
/// member, and a blank line after each group. Writes nothing when there are
/// no duplicates.
pub fn write_report<W: Write>(out: &mut W, duplicates: &[DuplicateGroup], color: bool) -> io::Result<()> {
    for group in duplicates {
        let prefix = hash_prefix(&group.hash, REPORT_PREFIX_LEN);
        if color {
            writeln!(out, "{}", DUPLICATE_HEADER.yellow().bold())?;
        } else {
            writeln!(out, "{DUPLICATE_HEADER}")?;
        }
        for path in &group.paths {
            if color {
                writeln!(out, "\t{}\t{}", prefix.cyan(), path.display())?;
            } else {
                writeln!(out, "\t{prefix}\t{}", path.display())?;
            }
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Write the report as a JSON array of `{hash, paths}` objects.
pub fn write_report_json<W: Write>(out: &mut W, duplicates: &[DuplicateGroup]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, duplicates)?;
    writeln!(out)?;
    out.flush()
}
