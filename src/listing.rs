use std::io::{self, Write};

use colored::Colorize;

use crate::utils::{FileEntry, LISTING_PREFIX_LEN};

/// Write one listing line: `<12-hex prefix>\t<path>`.
pub fn write_entry<W: Write>(out: &mut W, entry: &FileEntry, color: bool) -> io::Result<()> {
    let prefix = entry.hash_prefix(LISTING_PREFIX_LEN);
    if color {
        writeln!(out, "{}\t{}", prefix.cyan(), entry.path().display())
    } else {
        writeln!(out, "{prefix}\t{}", entry.path().display())
    }
}

/// Write one entry as a single-line JSON object carrying the full hash.
pub fn write_entry_json<W: Write>(out: &mut W, entry: &FileEntry) -> io::Result<()> {
    serde_json::to_writer(&mut *out, entry)?;
    writeln!(out)
}

/// Print entries as they arrive.
///
/// Output starts before the walk finishes. Returns how many entries were
/// written; a write failure stops consumption so the caller can drop the
/// receiver.
pub fn stream_listing<W, I>(out: &mut W, entries: I, json: bool, color: bool) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = FileEntry>,
{
    let mut written = 0;
    for entry in entries {
        if json {
            write_entry_json(out, &entry)?;
        } else {
            write_entry(out, &entry, color)?;
        }
        written += 1;
    }
    out.flush()?;
    Ok(written)
}
