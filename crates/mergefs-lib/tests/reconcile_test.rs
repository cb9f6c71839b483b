//! Tests for fixup and unused: repairing and auditing the merge directory.

mod common;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use common::{assert_symlink, TestFarm};
use mergefs_lib::ops::{distribute, fixup, unused};

fn symlinks_in(dir: &Path) -> BTreeSet<(PathBuf, PathBuf)> {
    walk(dir)
        .into_iter()
        .filter(|p| fs::symlink_metadata(p).unwrap().file_type().is_symlink())
        .map(|p| {
            let target = fs::read_link(&p).unwrap();
            (p, target)
        })
        .collect()
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if fs::symlink_metadata(&path).unwrap().is_dir() {
            out.extend(walk(&path));
        } else {
            out.push(path);
        }
    }
    out
}

#[test]
fn test_fixup_links_out_of_band_file() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100);
    farm.write("s1/b.txt", 10);

    let (mut manager, stores) = farm.open("merge", &["s1"]);
    let report = fixup(&mut manager, &stores).unwrap();

    assert_eq!(report.linked.len(), 1);
    assert_symlink(&farm.path("merge/b.txt"), &farm.path("s1/b.txt"));

    // Nothing is left over once the link exists.
    assert!(unused(&manager, &stores).unwrap().is_empty());
}

#[test]
fn test_fixup_creates_parent_directories() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100);
    farm.write("s1/deep/er/file.txt", 10);

    let (mut manager, stores) = farm.open("merge", &["s1"]);
    fixup(&mut manager, &stores).unwrap();

    assert_symlink(
        &farm.path("merge/deep/er/file.txt"),
        &farm.path("s1/deep/er/file.txt"),
    );
}

#[test]
fn test_fixup_is_idempotent() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100)
        .with_mount("s2", 100);
    farm.write("s1/a.txt", 10);
    farm.write("s2/dir/b.txt", 10);

    let (mut manager, stores) = farm.open("merge", &["s1", "s2"]);
    let first = fixup(&mut manager, &stores).unwrap();
    let after_first = symlinks_in(&farm.path("merge"));

    let second = fixup(&mut manager, &stores).unwrap();
    assert!(second.linked.is_empty());
    assert_eq!(symlinks_in(&farm.path("merge")), after_first);
    assert_eq!(first.linked.len(), 2);

    // A fresh manager rescans the disk and still finds nothing to do.
    let (mut rescanned, stores) = farm.open("merge", &["s1", "s2"]);
    assert!(fixup(&mut rescanned, &stores).unwrap().linked.is_empty());
    assert_eq!(symlinks_in(&farm.path("merge")), after_first);
}

#[test]
fn test_fixup_links_first_replica_only() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100)
        .with_mount("s2", 100);
    farm.write("s1/same.txt", 10);
    farm.write("s2/same.txt", 10);

    let (mut manager, stores) = farm.open("merge", &["s1", "s2"]);
    let report = fixup(&mut manager, &stores).unwrap();

    assert_eq!(report.linked.len(), 1);
    assert_symlink(&farm.path("merge/same.txt"), &farm.path("s1/same.txt"));
}

#[test]
fn test_fixup_leaves_staged_files_alone() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100);
    farm.write("s1/c.txt", 10);
    farm.write("merge/c.txt", 20);

    let (mut manager, stores) = farm.open("merge", &["s1"]);
    let report = fixup(&mut manager, &stores).unwrap();

    assert!(report.linked.is_empty());
    assert_eq!(report.blocked, vec![PathBuf::from("c.txt")]);
    assert_eq!(fs::read(farm.path("merge/c.txt")).unwrap().len(), 20);
}

#[test]
fn test_unused_lists_unlinked_files() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100)
        .with_mount("s2", 100);
    farm.write("s1/linked.txt", 10);
    farm.write("s1/orphan.txt", 10);
    farm.write("s2/nested/orphan2.txt", 10);
    std::os::unix::fs::symlink(farm.path("s1/linked.txt"), farm.path("merge/linked.txt"))
        .unwrap();

    let (manager, stores) = farm.open("merge", &["s1", "s2"]);
    let listed: BTreeSet<PathBuf> = unused(&manager, &stores).unwrap().into_iter().collect();

    let expected: BTreeSet<PathBuf> = [
        farm.path("s1/orphan.txt"),
        farm.path("s2/nested/orphan2.txt"),
    ]
    .into_iter()
    .collect();
    assert_eq!(listed, expected);

    // Read-only: nothing was created or removed.
    assert!(!farm.path("merge/orphan.txt").exists());
    assert!(farm.path("s1/orphan.txt").exists());
}

#[test]
fn test_unused_empty_for_fully_linked_store() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100);
    farm.write("merge/x.txt", 10);
    farm.write("merge/y/z.txt", 10);

    let (mut manager, stores) = farm.open("merge", &["s1"]);
    distribute(&mut manager, &stores).unwrap();

    assert!(unused(&manager, &stores).unwrap().is_empty());
}

#[test]
fn test_fixup_recovers_interrupted_distribute() {
    // A crash between removing the staged file and creating its symlink
    // leaves the data only in the store.
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100);
    farm.write("s1/half.txt", 10);

    let (mut manager, stores) = farm.open("merge", &["s1"]);
    assert_eq!(unused(&manager, &stores).unwrap(), vec![farm.path("s1/half.txt")]);

    fixup(&mut manager, &stores).unwrap();
    assert_symlink(&farm.path("merge/half.txt"), &farm.path("s1/half.txt"));
    assert!(unused(&manager, &stores).unwrap().is_empty());
}

#[test]
fn test_unused_follows_renamed_link() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100);
    farm.write("s1/a.txt", 10);
    farm.write("s1/b.txt", 10);
    std::os::unix::fs::symlink(farm.path("s1/a.txt"), farm.path("merge/renamed.txt")).unwrap();

    let (manager, stores) = farm.open("merge", &["s1"]);

    assert_eq!(unused(&manager, &stores).unwrap(), vec![farm.path("s1/b.txt")]);
}

#[test]
fn test_unused_resolves_relative_link_targets() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100);
    farm.write("s1/deep/a.txt", 10);
    farm.write("s1/b.txt", 10);
    fs::create_dir_all(farm.path("merge/sub")).unwrap();
    std::os::unix::fs::symlink("../../s1/deep/a.txt", farm.path("merge/sub/moved.txt")).unwrap();

    let (manager, stores) = farm.open("merge", &["s1"]);

    assert_eq!(unused(&manager, &stores).unwrap(), vec![farm.path("s1/b.txt")]);
}

#[test]
fn test_unused_counts_replica_behind_same_path_link() {
    let farm = TestFarm::new()
        .with_mount("merge", 0)
        .with_mount("s1", 100)
        .with_mount("s2", 100);
    farm.write("s1/a.txt", 10);
    farm.write("s2/a.txt", 10);
    std::os::unix::fs::symlink(farm.path("s1/a.txt"), farm.path("merge/a.txt")).unwrap();

    let (manager, stores) = farm.open("merge", &["s1", "s2"]);

    assert!(unused(&manager, &stores).unwrap().is_empty());
}
