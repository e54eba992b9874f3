use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf, is_separator};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use indicatif::{HumanBytes, HumanCount};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::digest::DigestAlgorithm;
use crate::error::WalkError;
use crate::utils::FileEntry;

/// Entries buffered between the walker and the aggregator by default.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Stack for the walker thread and every hashing thread. Each directory
/// level nests a few frames, plus whatever a worker steals while it waits
/// in `rayon::scope`; this covers trees as deep as `PATH_MAX` allows.
pub const WALK_STACK_SIZE: usize = 32 * 1024 * 1024;

/// How the children of a directory are visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Traversal {
    /// One child at a time in sorted listing order; the first error stops the walk.
    Sequential,
    /// One task per child; a directory waits for all of its children.
    #[default]
    Concurrent,
}

impl Traversal {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
        }
    }
}

/// Producer side of the entry channel, shared by every walker task.
#[derive(Debug, Clone)]
pub enum EntrySender {
    Unbounded(Sender<FileEntry>),
    Bounded(SyncSender<FileEntry>),
}

impl EntrySender {
    /// Publish an entry, blocking while a bounded channel is full.
    pub fn send(&self, entry: FileEntry) -> Result<(), WalkError> {
        let sent = match self {
            Self::Unbounded(tx) => tx.send(entry),
            Self::Bounded(tx) => tx.send(entry),
        };
        sent.map_err(|mpsc::SendError(entry)| WalkError::ChannelClosed {
            path: entry.into_parts().0,
        })
    }
}

/// Create the walker→aggregator channel.
///
/// `None` gives an unbounded queue. `Some(n)` bounds it to `n` entries, and
/// `Some(0)` makes every send a rendezvous with the consumer.
pub fn entry_channel(capacity: Option<usize>) -> (EntrySender, Receiver<FileEntry>) {
    match capacity {
        Some(bound) => {
            let (tx, rx) = mpsc::sync_channel(bound);
            (EntrySender::Bounded(tx), rx)
        }
        None => {
            let (tx, rx) = mpsc::channel();
            (EntrySender::Unbounded(tx), rx)
        }
    }
}

/// Strip one trailing separator from a top-level root.
///
/// `"/tmp/data/"` becomes `"/tmp/data"`; a bare `"/"` is left alone. Works
/// on the raw encoded bytes so non-UTF-8 roots are handled too.
pub fn normalize_root(root: &Path) -> PathBuf {
    let bytes = root.as_os_str().as_encoded_bytes();
    match bytes.split_last() {
        Some((&last, rest)) if !rest.is_empty() && last.is_ascii() && is_separator(char::from(last)) => {
            // SAFETY: `rest` came from `as_encoded_bytes` and is split just
            // before an ASCII separator, a valid non-empty UTF-8 substring.
            let trimmed = unsafe { OsStr::from_encoded_bytes_unchecked(rest) };
            PathBuf::from(trimmed)
        }
        _ => root.to_path_buf(),
    }
}

/// Totals for one completed walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub files: u64,
    pub directories: u64,
    pub bytes: u64,
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    files: AtomicU64,
    directories: AtomicU64,
    bytes: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    fn summary(&self) -> WalkSummary {
        WalkSummary {
            files: self.files.load(Ordering::Relaxed),
            directories: self.directories.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Recursive tree hasher.
///
/// Each regular file reachable from the root is hashed once and sent on the
/// channel. Any stat, listing, open or read failure aborts the walk. In
/// concurrent mode a failing child does not cancel its siblings: they run to
/// completion and may still send entries before the error is returned.
#[derive(Debug, Clone, Copy)]
pub struct Walker {
    algorithm: DigestAlgorithm,
    traversal: Traversal,
}

impl Walker {
    pub fn new(algorithm: DigestAlgorithm, traversal: Traversal) -> Self {
        Self {
            algorithm,
            traversal,
        }
    }

    /// Walk `root`, sending one entry per regular file.
    ///
    /// Concurrent traversal spawns onto the current rayon pool; call it
    /// inside `ThreadPool::install` to choose the pool.
    pub fn walk(&self, root: &Path, sink: &EntrySender) -> Result<WalkSummary, WalkError> {
        let root = normalize_root(root);
        info!(
            "Walking '{}' ({} traversal, {})",
            root.display(),
            self.traversal.name(),
            self.algorithm.name()
        );

        let counters = Counters::default();
        self.walk_path(&root, sink, &counters)?;

        let summary = counters.summary();
        info!(
            "Hashed {} files in {} directories ({})",
            HumanCount(summary.files),
            HumanCount(summary.directories),
            HumanBytes(summary.bytes)
        );
        Ok(summary)
    }

    /// Hash each path directly, in order, without recursing.
    pub fn hash_files(&self, paths: &[PathBuf], sink: &EntrySender) -> Result<WalkSummary, WalkError> {
        info!("Hashing {} files ({})", paths.len(), self.algorithm.name());
        let counters = Counters::default();
        for path in paths {
            let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            self.hash_into(path.clone(), size, sink, &counters)?;
        }
        Ok(counters.summary())
    }

    fn walk_path(&self, path: &Path, sink: &EntrySender, counters: &Counters) -> Result<(), WalkError> {
        let metadata = fs::metadata(path).map_err(|source| WalkError::Stat {
            path: path.to_path_buf(),
            source,
        })?;

        if metadata.is_dir() {
            counters.directories.fetch_add(1, Ordering::Relaxed);
            let children = list_children(path)?;
            debug!("Entering '{}' ({} entries)", path.display(), children.len());
            match self.traversal {
                Traversal::Sequential => {
                    for child in &children {
                        self.walk_path(child, sink, counters)?;
                    }
                    Ok(())
                }
                Traversal::Concurrent => self.walk_children_concurrently(&children, sink, counters),
            }
        } else if metadata.is_file() {
            self.hash_into(path.to_path_buf(), metadata.len(), sink, counters)
        } else {
            warn!("Skipping '{}': not a regular file", path.display());
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    /// Spawn every child and wait for all of them, then report the first
    /// failure in listing order.
    fn walk_children_concurrently(
        &self,
        children: &[PathBuf],
        sink: &EntrySender,
        counters: &Counters,
    ) -> Result<(), WalkError> {
        let mut results: Vec<Result<(), WalkError>> = Vec::with_capacity(children.len());
        results.resize_with(children.len(), || Ok(()));

        rayon::scope(|scope| {
            for (child, slot) in children.iter().zip(results.iter_mut()) {
                scope.spawn(move |_| *slot = self.walk_path(child, sink, counters));
            }
        });

        results.into_iter().collect()
    }

    fn hash_into(
        &self,
        path: PathBuf,
        size: u64,
        sink: &EntrySender,
        counters: &Counters,
    ) -> Result<(), WalkError> {
        let entry = FileEntry::from_path(path, self.algorithm)?;
        counters.files.fetch_add(1, Ordering::Relaxed);
        counters.bytes.fetch_add(size, Ordering::Relaxed);
        sink.send(entry)
    }
}

/// Immediate children of `dir`, sorted by name.
fn list_children(dir: &Path) -> Result<Vec<PathBuf>, WalkError> {
    let read_dir_error = |source| WalkError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut children = fs::read_dir(dir)
        .map_err(read_dir_error)?
        .map(|entry| entry.map(|e| dir.join(e.file_name())).map_err(read_dir_error))
        .collect::<Result<Vec<_>, _>>()?;
    children.sort();
    Ok(children)
}

/// Settings for a background walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    pub algorithm: DigestAlgorithm,
    pub traversal: Traversal,
    /// Rayon pool size for concurrent traversal; `None` uses one thread per CPU.
    pub threads: Option<usize>,
    /// Channel bound; `None` is unbounded.
    pub channel_capacity: Option<usize>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::default(),
            traversal: Traversal::default(),
            threads: None,
            channel_capacity: Some(DEFAULT_CHANNEL_CAPACITY),
        }
    }
}

/// A walk running on its own thread, plus the receiving end of its channel.
///
/// The producer thread owns the only sender, so the channel closes as soon
/// as the walk returns, fails or panics, and [`entries`](Self::entries)
/// always terminates.
pub struct WalkHandle {
    receiver: Receiver<FileEntry>,
    producer: JoinHandle<Result<WalkSummary, WalkError>>,
}

impl WalkHandle {
    /// Entries in arrival order, until the producer closes the channel.
    pub fn entries(&self) -> mpsc::Iter<'_, FileEntry> {
        self.receiver.iter()
    }

    /// Close the receiving side and wait for the producer's outcome.
    ///
    /// Dropping the receiver first unblocks a producer stuck on a full
    /// channel if the consumer stopped early; it then fails with
    /// [`WalkError::ChannelClosed`].
    pub fn finish(self) -> Result<WalkSummary> {
        let Self { receiver, producer } = self;
        drop(receiver);
        match producer.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(anyhow!("walker thread panicked")),
        }
    }
}

/// Start walking `root` in the background.
pub fn spawn_walk(root: PathBuf, options: &WalkOptions) -> Result<WalkHandle> {
    spawn_producer(options, move |walker, sink| walker.walk(&root, sink))
}

/// Start hashing `paths` in the background, one at a time and without recursion.
pub fn spawn_hash_files(paths: Vec<PathBuf>, options: &WalkOptions) -> Result<WalkHandle> {
    spawn_producer(options, move |walker, sink| walker.hash_files(&paths, sink))
}

fn spawn_producer<F>(options: &WalkOptions, work: F) -> Result<WalkHandle>
where
    F: FnOnce(&Walker, &EntrySender) -> Result<WalkSummary, WalkError> + Send + 'static,
{
    let pool = match options.traversal {
        Traversal::Concurrent => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(options.threads.unwrap_or(0))
                .thread_name(|i| format!("hash-{i}"))
                .stack_size(WALK_STACK_SIZE)
                .build()
                .context("Failed to build hashing thread pool")?,
        ),
        Traversal::Sequential => None,
    };

    let walker = Walker::new(options.algorithm, options.traversal);
    let (sink, receiver) = entry_channel(options.channel_capacity);

    let producer = thread::Builder::new()
        .name("walker".to_string())
        .stack_size(WALK_STACK_SIZE)
        .spawn(move || match pool {
            Some(pool) => pool.install(|| work(&walker, &sink)),
            None => work(&walker, &sink),
        })
        .context("Failed to spawn walker thread")?;

    Ok(WalkHandle { receiver, producer })
}
