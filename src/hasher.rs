use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::debug;

use crate::digest::DigestAlgorithm;
use crate::error::WalkError;
use crate::utils::FileEntry;

/// Read `path` fully into memory and digest it.
///
/// The whole file is buffered before hashing, so the tool is limited to
/// files that fit in memory. The handle only exists once `open` succeeded
/// and is closed when it goes out of scope, on every return path.
pub fn hash_file(path: &Path, algorithm: DigestAlgorithm) -> Result<Vec<u8>, WalkError> {
    let mut file = File::open(path).map_err(|source| WalkError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let capacity = file
        .metadata()
        .map(|m| usize::try_from(m.len()).unwrap_or(0))
        .unwrap_or(0);
    let mut contents = Vec::with_capacity(capacity);
    file.read_to_end(&mut contents)
        .map_err(|source| WalkError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    drop(file);

    debug!("Hashing '{}' ({} bytes)", path.display(), contents.len());
    Ok(algorithm.digest(&contents))
}

impl FileEntry {
    /// Hash the file at `path` and wrap the hex digest in an entry.
    pub fn from_path(path: PathBuf, algorithm: DigestAlgorithm) -> Result<Self, WalkError> {
        let digest = hash_file(&path, algorithm)?;
        Ok(Self::new(path, hex::encode(digest)))
    }
}
