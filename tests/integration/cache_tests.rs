//! Content index persistence and recovery.

use orgphoto::cache::{relative_key, ContentIndex, HashCache, StoreLocation, CACHE_FILE_NAME};
use orgphoto::scanner::Hasher;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_build_close_reopen_reuses_records() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("2021_01_01/a.jpg"), b"same");
    write(&root.join("2022_02_02/b.jpg"), b"same");
    write(&root.join("2022_02_02/c.jpg"), b"other");

    let mut index = ContentIndex::open(&root, None);
    let first = index.build();
    assert_eq!(first.hashed, 3);
    assert_eq!(index.stats().duplicate_groups, 1);
    assert_eq!(
        index.location(),
        &StoreLocation::Persistent(root.join(CACHE_FILE_NAME))
    );
    index.close().unwrap();

    let mut index = ContentIndex::open(&root, None);
    assert_eq!(index.len(), 3);
    let second = index.build();
    assert_eq!(second.hashed, 0);
    assert_eq!(second.reused, 3);

    let dups = index.find_duplicates(&root.join("2021_01_01/a.jpg"), None);
    assert_eq!(
        dups,
        vec![root.join("2021_01_01/a.jpg"), root.join("2022_02_02/b.jpg")]
    );
}

#[test]
fn test_changed_and_deleted_files_are_refreshed() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("a.jpg"), b"one");
    write(&root.join("b.jpg"), b"two");

    let mut index = ContentIndex::open(&root, None);
    index.build();
    index.close().unwrap();

    write(&root.join("a.jpg"), b"one, but longer now");
    fs::remove_file(root.join("b.jpg")).unwrap();

    let mut index = ContentIndex::open(&root, None);
    let stats = index.build();
    assert_eq!(stats.hashed, 1);
    assert_eq!(stats.stale_removed, 1);
    assert_eq!(index.len(), 1);

    let expected = Hasher::new().full_hash(&root.join("a.jpg")).unwrap();
    assert_eq!(index.hash_of(&root.join("a.jpg")), Some(expected));
    assert!(index.hash_of(&root.join("b.jpg")).is_none());
}

#[test]
fn test_corrupt_store_is_recreated() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("a.jpg"), b"content");
    fs::write(root.join(CACHE_FILE_NAME), b"this is not a sqlite database").unwrap();

    let mut index = ContentIndex::open(&root, None);
    assert!(matches!(index.location(), StoreLocation::Persistent(_)));
    assert!(index.is_empty());
    assert_eq!(index.build().hashed, 1);
    index.close().unwrap();

    let cache = HashCache::new(&root.join(CACHE_FILE_NAME)).unwrap();
    assert_eq!(cache.len().unwrap(), 1);
}

#[test]
fn test_schema_mismatch_drops_records() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("a.jpg"), b"content");

    let mut index = ContentIndex::open(&root, None);
    index.build();
    index.close().unwrap();

    let conn = Connection::open(root.join(CACHE_FILE_NAME)).unwrap();
    conn.execute(
        "UPDATE cache_meta SET value = '0' WHERE key = 'schema_version'",
        [],
    )
    .unwrap();
    drop(conn);

    let mut index = ContentIndex::open(&root, None);
    assert!(index.is_empty());
    let stats = index.build();
    assert_eq!(stats.hashed, 1);
    assert_eq!(stats.reused, 0);
}

#[test]
fn test_store_file_and_excluded_files_are_not_indexed() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("a.jpg"), b"content");
    write(&root.join("events.log"), b"log lines");

    let mut index = ContentIndex::open(&root, None);
    index.exclude_file(root.join("events.log"));
    index.build();
    index.close().unwrap();

    // second build sees the on-disk store file and must still skip it
    let mut index = ContentIndex::open(&root, None);
    index.exclude_file(root.join("events.log"));
    let stats = index.build();
    assert_eq!(index.len(), 1);
    assert_eq!(stats.reused, 1);
    assert!(index.record(&root.join(CACHE_FILE_NAME)).is_none());
}

#[test]
fn test_separate_cache_dir() {
    let target = tempdir().unwrap();
    let cache = tempdir().unwrap();
    let root = target.path().canonicalize().unwrap();
    let cache_dir = cache.path().join("nested/cache");
    write(&root.join("a.jpg"), b"content");

    let mut index = ContentIndex::open(&root, Some(&cache_dir));
    index.build();
    index.close().unwrap();

    assert!(cache_dir.join(CACHE_FILE_NAME).exists());
    assert!(!root.join(CACHE_FILE_NAME).exists());
}

#[test]
fn test_add_and_invalidate_follow_the_store() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(&root.join("a.jpg"), b"content");

    let mut index = ContentIndex::open(&root, None);
    assert!(index.add_file(&root.join("a.jpg"), None).unwrap());
    assert!(!index.add_file(Path::new("/definitely/elsewhere.jpg"), None).unwrap());

    let hash = index.hash_of(&root.join("a.jpg")).unwrap();
    write(&root.join("sub/b.jpg"), b"content");
    index.add_file(&root.join("sub/b.jpg"), Some(hash)).unwrap();
    assert_eq!(index.paths_with_hash(&hash).len(), 2);

    assert!(index.invalidate_file(&root.join("a.jpg")));
    assert!(!index.invalidate_file(&root.join("a.jpg")));
    index.close().unwrap();

    let cache = HashCache::new(&root.join(CACHE_FILE_NAME)).unwrap();
    let key = relative_key(&root, &root.join("sub/b.jpg")).unwrap();
    assert_eq!(key, "sub/b.jpg");
    assert!(cache.get(&key).unwrap().is_some());
    assert!(cache.get("a.jpg").unwrap().is_none());
}
