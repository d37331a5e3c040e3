//! Content index over a destination tree.
//!
//! [`ContentIndex`] answers "does any file under the target already hold
//! these exact bytes?". It keeps every valid [`CacheRecord`] in memory
//! together with a derived `hash -> paths` map, and mirrors all changes into
//! a [`HashCache`] so repeated runs only rehash files whose size or
//! modification time changed.
//!
//! Persistence is best-effort. A corrupt store is recreated, an unusable
//! location falls back to an in-memory SQLite database, and a write failure
//! in the middle of a run degrades the index to its in-memory maps. None of
//! these abort a run.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use serde::Serialize;

use super::database::{store_files, CacheError, HashCache, CACHE_FILE_NAME};
use super::entry::{relative_key, CacheRecord};
use crate::progress::{ProgressCallback, PHASE_INDEX};
use crate::scanner::{system_time_to_secs, Hash, HashError, Hasher, Walker, WalkerConfig};

/// Where the index persists its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum StoreLocation {
    /// A database file on disk.
    Persistent(PathBuf),
    /// An in-memory SQLite database (lost at exit).
    InMemory,
    /// No store at all; only the in-memory maps.
    Unavailable,
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistent(path) => write!(f, "{}", path.display()),
            Self::InMemory => write!(f, "in-memory"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Counters from one [`ContentIndex::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Files whose content was read and hashed.
    pub hashed: usize,
    /// Files whose stored record was still valid.
    pub reused: usize,
    /// Records removed because their file disappeared.
    pub stale_removed: usize,
    /// Files that could not be read.
    pub failed: usize,
    /// Bytes read while hashing.
    pub bytes_hashed: u64,
    /// Wall-clock duration of the build.
    pub elapsed: Duration,
}

impl BuildStats {
    /// Files indexed after the build (hashed plus reused).
    #[must_use]
    pub fn total_indexed(&self) -> usize {
        self.hashed + self.reused
    }
}

/// Summary of the index contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of indexed files.
    pub total_files: usize,
    /// Number of distinct content hashes.
    pub unique_hashes: usize,
    /// Number of hashes shared by two or more files.
    pub duplicate_groups: usize,
}

/// Content-addressed index of a target tree.
pub struct ContentIndex {
    target_dir: PathBuf,
    store: Option<HashCache>,
    location: StoreLocation,
    records: HashMap<String, CacheRecord>,
    by_hash: HashMap<Hash, BTreeSet<String>>,
    hasher: Hasher,
    excluded_files: Vec<PathBuf>,
    excluded_dirs: Vec<PathBuf>,
}

impl std::fmt::Debug for ContentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentIndex")
            .field("target_dir", &self.target_dir)
            .field("location", &self.location)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl ContentIndex {
    /// Open the index for `target_dir`.
    ///
    /// The store lives at `<cache_dir or target_dir>/.orgphoto_cache.db`. An
    /// explicit `cache_dir` is created if missing. Stored records are loaded
    /// into memory; nothing is hashed until [`build`](Self::build).
    #[must_use]
    pub fn open(target_dir: &Path, cache_dir: Option<&Path>) -> Self {
        let db_path = Self::store_path(target_dir, cache_dir);
        if let Some(dir) = cache_dir {
            if let Err(e) = fs::create_dir_all(dir) {
                log::warn!("Cannot create cache directory {}: {}", dir.display(), e);
            }
        }

        let (store, location, records) = open_store(&db_path);
        log::debug!(
            "Content index for {} uses {} store with {} records",
            target_dir.display(),
            location,
            records.len()
        );

        Self::with_store(target_dir, store, location, records)
    }

    /// Open an index whose records live only for this process.
    ///
    /// Nothing is written under `target_dir` or anywhere else; a dry run
    /// against a tree without a store uses this.
    #[must_use]
    pub fn open_in_memory(target_dir: &Path) -> Self {
        let (store, location) = match HashCache::in_memory() {
            Ok(cache) => (Some(cache), StoreLocation::InMemory),
            Err(e) => {
                log::warn!("In-memory hash cache unavailable ({}); index will not persist", e);
                (None, StoreLocation::Unavailable)
            }
        };
        Self::with_store(target_dir, store, location, Vec::new())
    }

    /// Path of the store file [`open`](Self::open) would use.
    #[must_use]
    pub fn store_path(target_dir: &Path, cache_dir: Option<&Path>) -> PathBuf {
        cache_dir.unwrap_or(target_dir).join(CACHE_FILE_NAME)
    }

    fn with_store(
        target_dir: &Path,
        store: Option<HashCache>,
        location: StoreLocation,
        records: Vec<CacheRecord>,
    ) -> Self {
        let mut index = Self {
            target_dir: target_dir.to_path_buf(),
            store,
            location,
            records: HashMap::new(),
            by_hash: HashMap::new(),
            hasher: Hasher::new(),
            excluded_files: Vec::new(),
            excluded_dirs: Vec::new(),
        };
        for record in records {
            index.insert_memory(record);
        }
        index
    }

    /// Never index the file at `path` (e.g. the run's event log).
    pub fn exclude_file(&mut self, path: impl Into<PathBuf>) {
        self.excluded_files.push(path.into());
    }

    /// Never index anything below `dir`. Records already stored for that
    /// subtree are dropped as stale by the next build.
    pub fn exclude_dir(&mut self, dir: impl Into<PathBuf>) {
        self.excluded_dirs.push(dir.into());
    }

    /// Root of the indexed tree.
    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Where records are persisted.
    #[must_use]
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stored record for an absolute path under the target.
    #[must_use]
    pub fn record(&self, path: &Path) -> Option<&CacheRecord> {
        relative_key(&self.target_dir, path).and_then(|key| self.records.get(&key))
    }

    /// Stored hash for an absolute path under the target.
    #[must_use]
    pub fn hash_of(&self, path: &Path) -> Option<Hash> {
        self.record(path).map(|r| r.content_hash)
    }

    fn walker(&self) -> Walker {
        let mut config = WalkerConfig::default().exclude_name_prefix(CACHE_FILE_NAME);
        for file in &self.excluded_files {
            config = config.exclude_file(file.clone());
        }
        for dir in &self.excluded_dirs {
            config = config.exclude_dir(dir.clone());
        }
        Walker::new(&self.target_dir, config)
    }

    /// Bring the index up to date with the target tree.
    ///
    /// Unchanged files reuse their record, new or changed files are hashed,
    /// and records whose file is gone are removed. All store writes happen
    /// in one transaction at the end.
    pub fn build(&mut self) -> BuildStats {
        self.build_with_progress(None)
    }

    /// [`build`](Self::build) with progress notifications.
    pub fn build_with_progress(&mut self, progress: Option<&dyn ProgressCallback>) -> BuildStats {
        let start = Instant::now();
        let mut stats = BuildStats::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut upserts = Vec::new();

        if let Some(p) = progress {
            p.on_phase_start(PHASE_INDEX, 0);
        }

        if self.target_dir.is_dir() {
            let walker = self.walker();
            for (i, entry) in walker.walk().enumerate() {
                let file = match entry {
                    Ok(file) => file,
                    Err(e) => {
                        log::warn!("Skipping unreadable entry while indexing: {}", e);
                        continue;
                    }
                };
                if let Some(p) = progress {
                    p.on_progress(i + 1, &file.path.to_string_lossy());
                }

                let Some(key) = relative_key(&self.target_dir, &file.path) else {
                    log::debug!("Not indexing {}: no usable relative path", file.path.display());
                    continue;
                };

                let mtime = file.mtime_secs();
                if self
                    .records
                    .get(&key)
                    .is_some_and(|r| r.matches(file.size, mtime))
                {
                    stats.reused += 1;
                    seen.insert(key);
                    continue;
                }

                match self.hasher.full_hash(&file.path) {
                    Ok(hash) => {
                        stats.hashed += 1;
                        stats.bytes_hashed += file.size;
                        upserts.push(CacheRecord::new(key.clone(), hash, file.size, mtime));
                        seen.insert(key);
                    }
                    Err(e) => {
                        stats.failed += 1;
                        log::warn!("Failed to hash {}: {}", file.path.display(), e);
                        failed.insert(key);
                    }
                }
            }
        } else {
            log::debug!(
                "Target {} does not exist yet; nothing to index",
                self.target_dir.display()
            );
        }

        let removals: Vec<String> = self
            .records
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        stats.stale_removed = removals.iter().filter(|k| !failed.contains(*k)).count();

        self.apply(upserts, removals);
        stats.elapsed = start.elapsed();

        if let Some(p) = progress {
            p.on_phase_end(PHASE_INDEX);
        }

        log::info!(
            "Indexed {}: {} hashed ({}), {} reused, {} stale removed, {} failed in {:.2?}",
            self.target_dir.display(),
            stats.hashed,
            ByteSize::b(stats.bytes_hashed),
            stats.reused,
            stats.stale_removed,
            stats.failed,
            stats.elapsed
        );
        stats
    }

    /// Every indexed path (absolute, sorted) whose content equals `path`'s.
    ///
    /// The hash is computed when `known_hash` is `None`. The result may
    /// include `path` itself and is empty when hashing fails.
    #[must_use]
    pub fn find_duplicates(&self, path: &Path, known_hash: Option<&Hash>) -> Vec<PathBuf> {
        let hash = match known_hash {
            Some(hash) => *hash,
            None => match self.hasher.full_hash(path) {
                Ok(hash) => hash,
                Err(e) => {
                    log::warn!("Cannot hash {} for duplicate lookup: {}", path.display(), e);
                    return Vec::new();
                }
            },
        };
        self.paths_with_hash(&hash)
    }

    /// Hash a file with the index's hasher without touching the index.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be read.
    pub fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        self.hasher.full_hash(path)
    }

    /// Every indexed path (absolute, sorted) with the given hash.
    #[must_use]
    pub fn paths_with_hash(&self, hash: &Hash) -> Vec<PathBuf> {
        self.by_hash
            .get(hash)
            .map(|keys| keys.iter().map(|k| self.absolute(k)).collect())
            .unwrap_or_default()
    }

    /// Index one file, hashing it unless `known_hash` is given.
    ///
    /// Returns `Ok(false)` when `path` lies outside the target tree.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be stat'ed or read.
    pub fn add_file(&mut self, path: &Path, known_hash: Option<Hash>) -> Result<bool, HashError> {
        let Some(key) = relative_key(&self.target_dir, path) else {
            log::debug!(
                "Not indexing {}: outside {}",
                path.display(),
                self.target_dir.display()
            );
            return Ok(false);
        };

        let metadata = fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
        let mtime = metadata
            .modified()
            .map(system_time_to_secs)
            .map_err(|e| HashError::from_io(path, e))?;
        let hash = match known_hash {
            Some(hash) => hash,
            None => self.hasher.full_hash(path)?,
        };

        self.apply(
            vec![CacheRecord::new(key, hash, metadata.len(), mtime)],
            Vec::new(),
        );
        Ok(true)
    }

    /// Drop the record for `path`. Returns whether one existed.
    pub fn invalidate_file(&mut self, path: &Path) -> bool {
        let Some(key) = relative_key(&self.target_dir, path) else {
            return false;
        };
        if !self.records.contains_key(&key) {
            return false;
        }
        self.apply(Vec::new(), vec![key]);
        true
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                self.degrade(&e);
            }
        }
        self.records.clear();
        self.by_hash.clear();
    }

    /// Counts over the current contents.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_files: self.records.len(),
            unique_hashes: self.by_hash.len(),
            duplicate_groups: self.by_hash.values().filter(|s| s.len() > 1).count(),
        }
    }

    /// Flush and release the store.
    ///
    /// # Errors
    ///
    /// Returns the error reported while closing the database.
    pub fn close(self) -> Result<(), CacheError> {
        match self.store {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    fn absolute(&self, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.target_dir.clone(), |acc, part| acc.join(part))
    }

    /// Single mutation path: store first, then the in-memory maps.
    fn apply(&mut self, upserts: Vec<CacheRecord>, removals: Vec<String>) {
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.apply_batch(&upserts, &removals) {
                self.degrade(&e);
            }
        }
        for key in &removals {
            self.remove_memory(key);
        }
        for record in upserts {
            self.insert_memory(record);
        }
    }

    fn degrade(&mut self, err: &CacheError) {
        log::warn!(
            "Hash cache write failed ({}); continuing with an in-memory index",
            err
        );
        self.store = None;
        self.location = StoreLocation::Unavailable;
    }

    fn insert_memory(&mut self, record: CacheRecord) {
        self.remove_memory(&record.relative_path);
        self.by_hash
            .entry(record.content_hash)
            .or_default()
            .insert(record.relative_path.clone());
        self.records.insert(record.relative_path.clone(), record);
    }

    fn remove_memory(&mut self, key: &str) {
        if let Some(old) = self.records.remove(key) {
            if let Some(keys) = self.by_hash.get_mut(&old.content_hash) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_hash.remove(&old.content_hash);
                }
            }
        }
    }
}

/// Open the store at `db_path`, recreating or falling back as needed.
fn open_store(db_path: &Path) -> (Option<HashCache>, StoreLocation, Vec<CacheRecord>) {
    match open_persistent(db_path) {
        Ok((cache, records)) => {
            return (
                Some(cache),
                StoreLocation::Persistent(db_path.to_path_buf()),
                records,
            )
        }
        Err(e) => log::warn!(
            "Hash cache at {} is unusable ({}); recreating it",
            db_path.display(),
            e
        ),
    }

    for file in store_files(db_path) {
        match fs::remove_file(&file) {
            Ok(()) => log::debug!("Removed {}", file.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::debug!("Could not remove {}: {}", file.display(), e),
        }
    }

    match open_persistent(db_path) {
        Ok((cache, records)) => {
            return (
                Some(cache),
                StoreLocation::Persistent(db_path.to_path_buf()),
                records,
            )
        }
        Err(e) => log::warn!(
            "Cannot create hash cache at {} ({}); using an in-memory index",
            db_path.display(),
            e
        ),
    }

    match HashCache::in_memory() {
        Ok(cache) => (Some(cache), StoreLocation::InMemory, Vec::new()),
        Err(e) => {
            log::warn!("In-memory hash cache unavailable ({}); index will not persist", e);
            (None, StoreLocation::Unavailable, Vec::new())
        }
    }
}

fn open_persistent(db_path: &Path) -> Result<(HashCache, Vec<CacheRecord>), CacheError> {
    let cache = HashCache::new(db_path)?;
    let records = cache.load_all()?;
    Ok((cache, records))
}
