use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use treehash::{
    DigestAlgorithm, FileEntry, Traversal, WalkError, WalkOptions, find_duplicates, spawn_hash_files, spawn_walk,
};
use walkdir::WalkDir;

fn build_tree() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("docs/drafts")).unwrap();
    fs::create_dir_all(root.join("media/raw/2024")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::write(root.join("readme.md"), "readme").unwrap();
    fs::write(root.join("docs/a.txt"), "hello").unwrap();
    fs::write(root.join("docs/drafts/a-copy.txt"), "hello").unwrap();
    fs::write(root.join("docs/drafts/b.txt"), "world").unwrap();
    fs::write(root.join("media/raw/2024/img.bin"), [0u8; 4096]).unwrap();
    fs::write(root.join("media/img-backup.bin"), [0u8; 4096]).unwrap();
    fs::write(root.join("media/raw/empty.bin"), b"").unwrap();
    dir
}

fn collect(root: &Path, traversal: Traversal) -> Vec<FileEntry> {
    let options = WalkOptions {
        traversal,
        ..WalkOptions::default()
    };
    let handle = spawn_walk(root.to_path_buf(), &options).unwrap();
    let entries: Vec<FileEntry> = handle.entries().collect();
    handle.finish().unwrap();
    entries
}

fn regular_files(root: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

#[test]
fn test_every_regular_file_visited_once() {
    let dir = build_tree();
    let expected = regular_files(dir.path());

    for traversal in [Traversal::Sequential, Traversal::Concurrent] {
        let entries = collect(dir.path(), traversal);
        let paths: Vec<PathBuf> = entries.iter().map(|e| e.path().to_path_buf()).collect();
        let unique: BTreeSet<PathBuf> = paths.iter().cloned().collect();

        assert_eq!(paths.len(), unique.len(), "{traversal:?} visited a file twice");
        assert_eq!(unique, expected, "{traversal:?} missed or invented files");
    }
}

#[test]
fn test_duplicates_across_subdirectories() {
    let dir = build_tree();
    let dupes = find_duplicates(collect(dir.path(), Traversal::Concurrent));

    assert_eq!(dupes.len(), 2);
    let groups: BTreeSet<BTreeSet<String>> = dupes
        .iter()
        .map(|g| {
            g.paths
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        })
        .collect();
    assert!(groups.contains(&BTreeSet::from(["a.txt".to_string(), "a-copy.txt".to_string()])));
    assert!(groups.contains(&BTreeSet::from(["img.bin".to_string(), "img-backup.bin".to_string()])));
}

#[test]
fn test_identical_content_one_group() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    fs::write(dir.path().join("b.txt"), "hello").unwrap();

    let dupes = find_duplicates(collect(dir.path(), Traversal::Concurrent));
    assert_eq!(dupes.len(), 1);
    assert_eq!(
        dupes[0].paths,
        [dir.path().join("a.txt"), dir.path().join("b.txt")]
    );
    assert!(dupes[0].hash.starts_with("2cf24dba5fb0a30"));
}

#[test]
fn test_distinct_content_no_groups() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    fs::write(dir.path().join("b.txt"), "world").unwrap();

    assert!(find_duplicates(collect(dir.path(), Traversal::Sequential)).is_empty());
}

#[test]
fn test_trailing_separator_is_ignored() {
    let dir = build_tree();
    let plain = dir.path().to_string_lossy().into_owned();
    let slashed = format!("{plain}/");

    let with = collect(Path::new(&slashed), Traversal::Sequential);
    let without = collect(Path::new(&plain), Traversal::Sequential);
    assert_eq!(with, without);
    assert!(with.iter().all(|e| !e.path().to_string_lossy().contains("//")));
}

#[test]
fn test_algorithms_disagree_but_both_group() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), "same").unwrap();
    fs::write(dir.path().join("b"), "same").unwrap();

    let mut hashes = Vec::new();
    for algorithm in [DigestAlgorithm::Sha256, DigestAlgorithm::Blake3] {
        let options = WalkOptions {
            algorithm,
            ..WalkOptions::default()
        };
        let handle = spawn_walk(dir.path().to_path_buf(), &options).unwrap();
        let dupes = find_duplicates(handle.entries().collect::<Vec<_>>());
        handle.finish().unwrap();
        assert_eq!(dupes.len(), 1);
        hashes.push(dupes[0].hash.clone());
    }
    assert_ne!(hashes[0], hashes[1]);
}

#[test]
fn test_unbounded_and_rendezvous_channels() {
    let dir = build_tree();
    let expected = regular_files(dir.path());

    for capacity in [None, Some(0), Some(1)] {
        let options = WalkOptions {
            channel_capacity: capacity,
            threads: Some(3),
            ..WalkOptions::default()
        };
        let handle = spawn_walk(dir.path().to_path_buf(), &options).unwrap();
        let got: BTreeSet<PathBuf> = handle.entries().map(|e| e.path().to_path_buf()).collect();
        handle.finish().unwrap();
        assert_eq!(got, expected, "capacity {capacity:?}");
    }
}

#[test]
fn test_missing_root_fails() {
    let dir = tempdir().unwrap();
    let handle = spawn_walk(dir.path().join("nope"), &WalkOptions::default()).unwrap();
    assert_eq!(handle.entries().count(), 0);

    let err = handle.finish().unwrap_err();
    match err.downcast_ref::<WalkError>() {
        Some(WalkError::Stat { path, .. }) => assert!(path.ends_with("nope")),
        other => panic!("expected stat error, got {other:?}"),
    }
}

#[cfg(unix)]
fn locked_tree() -> Option<(TempDir, PathBuf)> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("secret.txt"), "secret").unwrap();
    fs::write(dir.path().join("a_open.txt"), "open").unwrap();
    fs::write(dir.path().join("z_open.txt"), "open too").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&locked).is_ok() {
        // privileged users bypass directory permissions
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        eprintln!("skipping unreadable-directory walk: running with elevated privileges");
        return None;
    }
    Some((dir, locked))
}

#[cfg(unix)]
fn unlock(locked: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(locked, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_aborts() {
    let Some((dir, locked)) = locked_tree() else {
        return;
    };
    let options = WalkOptions {
        traversal: Traversal::Sequential,
        ..WalkOptions::default()
    };
    let handle = spawn_walk(dir.path().to_path_buf(), &options).unwrap();
    let listed: Vec<PathBuf> = handle.entries().map(|e| e.path().to_path_buf()).collect();
    let err = handle.finish().unwrap_err();
    unlock(&locked);

    assert!(matches!(
        err.downcast_ref::<WalkError>(),
        Some(WalkError::ReadDir { path, .. }) if *path == locked
    ));
    // sorted order: a_open.txt, locked, z_open.txt; the walk stops at locked
    assert_eq!(listed, [dir.path().join("a_open.txt")]);
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_concurrent_keeps_siblings() {
    let Some((dir, locked)) = locked_tree() else {
        return;
    };
    let handle = spawn_walk(dir.path().to_path_buf(), &WalkOptions::default()).unwrap();
    let listed: BTreeSet<PathBuf> = handle.entries().map(|e| e.path().to_path_buf()).collect();
    let err = handle.finish().unwrap_err();
    unlock(&locked);

    assert!(matches!(
        err.downcast_ref::<WalkError>(),
        Some(WalkError::ReadDir { path, .. }) if *path == locked
    ));
    assert_eq!(
        listed,
        BTreeSet::from([dir.path().join("a_open.txt"), dir.path().join("z_open.txt")])
    );
}

#[cfg(unix)]
#[test]
fn test_nested_failure_surfaces_from_concurrent_walk() {
    // a dangling link fails the same way for every user
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/kept.txt"), "kept").unwrap();
    std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("sub/broken")).unwrap();

    let handle = spawn_walk(dir.path().to_path_buf(), &WalkOptions::default()).unwrap();
    let count = handle.entries().count();
    let err = handle.finish().unwrap_err();
    assert_eq!(count, 1);
    assert!(matches!(
        err.downcast_ref::<WalkError>(),
        Some(WalkError::Stat { path, .. }) if path.ends_with("sub/broken")
    ));
}

#[cfg(target_os = "linux")]
#[test]
fn test_trailing_separator_on_non_utf8_root() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    let dir = tempdir().unwrap();
    let root = dir.path().join(OsStr::from_bytes(b"caf\xe9"));
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a.txt"), "hello").unwrap();

    let mut slashed = root.clone().into_os_string().into_vec();
    slashed.push(b'/');
    let slashed = PathBuf::from(std::ffi::OsString::from_vec(slashed));

    let with = collect(&slashed, Traversal::Sequential);
    let without = collect(&root, Traversal::Sequential);
    assert_eq!(with, without);
    assert_eq!(with[0].path(), root.join("a.txt"));
}

#[test]
fn test_deep_tree_both_traversals() {
    const DEPTH: usize = 1500;

    let dir = tempdir().unwrap();
    let mut deepest = dir.path().to_path_buf();
    for _ in 0..DEPTH {
        deepest.push("d");
    }
    fs::create_dir_all(&deepest).unwrap();
    fs::write(deepest.join("f"), "bottom").unwrap();

    for traversal in [Traversal::Sequential, Traversal::Concurrent] {
        let options = WalkOptions {
            traversal,
            ..WalkOptions::default()
        };
        let handle = spawn_walk(dir.path().to_path_buf(), &options).unwrap();
        let count = handle.entries().count();
        let summary = handle.finish().unwrap();
        assert_eq!(count, 1, "{traversal:?}");
        assert_eq!(summary.directories, DEPTH as u64 + 1, "{traversal:?}");
    }
}

#[test]
fn test_hash_files_mode() {
    let dir = build_tree();
    let paths = vec![dir.path().join("readme.md"), dir.path().join("docs/a.txt")];

    let handle = spawn_hash_files(paths.clone(), &WalkOptions::default()).unwrap();
    let got: Vec<PathBuf> = handle.entries().map(|e| e.path().to_path_buf()).collect();
    let summary = handle.finish().unwrap();

    assert_eq!(got, paths);
    assert_eq!(summary.files, 2);
    assert_eq!(summary.directories, 0);
}

#[test]
fn test_hash_files_does_not_recurse() {
    let dir = build_tree();
    let handle = spawn_hash_files(vec![dir.path().join("docs")], &WalkOptions::default()).unwrap();
    assert_eq!(handle.entries().count(), 0);
    assert!(handle.finish().is_err());
}
