//! SQLite-backed store for content hashes.
//!
//! The store holds two tables:
//!
//! * `cache_meta(key, value)` with at least the `schema_version` row
//! * `file_hashes(path, hash, size, mtime)` keyed by the relative path
//!
//! A schema version mismatch drops and recreates `file_hashes` only, which
//! forces a full rehash on the next build.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use super::entry::CacheRecord;
use crate::scanner::hex_to_hash;

/// Current schema version written to `cache_meta`.
pub const SCHEMA_VERSION: &str = "1";

/// File name of the store inside the target (or cache) directory.
pub const CACHE_FILE_NAME: &str = ".orgphoto_cache.db";

/// Errors raised by the hash store.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// SQLite reported an error (including "file is not a database").
    #[error("Cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store directory could not be prepared.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// What `init_schema` found when the store was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaState {
    /// No schema existed; tables were created.
    Fresh,
    /// Schema matched the current version.
    Current,
    /// An older or unknown schema was replaced.
    Migrated {
        /// Version string found in the store.
        found: String,
    },
}

/// Persistent store of file hashes using SQLite.
pub struct HashCache {
    conn: Connection,
    path: Option<PathBuf>,
    schema_state: SchemaState,
}

impl std::fmt::Debug for HashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashCache")
            .field("path", &self.path)
            .field("schema_state", &self.schema_state)
            .finish_non_exhaustive()
    }
}

impl HashCache {
    /// Open or create the store at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or is not a valid SQLite database.
    pub fn new(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;
        let schema_state = Self::init_schema(&conn)?;
        log::debug!(
            "Opened hash cache at {} ({:?})",
            path.display(),
            schema_state
        );
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            schema_state,
        })
    }

    /// Open a store that lives only for the lifetime of this value.
    ///
    /// # Errors
    ///
    /// Fails if SQLite cannot allocate an in-memory database.
    pub fn in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        let schema_state = Self::init_schema(&conn)?;
        Ok(Self {
            conn,
            path: None,
            schema_state,
        })
    }

    fn init_schema(conn: &Connection) -> CacheResult<SchemaState> {
        conn.execute_batch(
            "
            PRAGMA synchronous = NORMAL;
            CREATE TABLE IF NOT EXISTS cache_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let found: Option<String> = conn
            .query_row(
                "SELECT value FROM cache_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let state = match found {
            Some(version) if version == SCHEMA_VERSION => SchemaState::Current,
            Some(version) => {
                log::info!(
                    "Hash cache schema {} does not match {}; rebuilding records",
                    version,
                    SCHEMA_VERSION
                );
                SchemaState::Migrated { found: version }
            }
            None => SchemaState::Fresh,
        };

        if state != SchemaState::Current {
            conn.execute_batch("DROP TABLE IF EXISTS file_hashes;")?;
        }

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS file_hashes (
                path TEXT PRIMARY KEY,
                hash TEXT NOT NULL,
                size INTEGER NOT NULL,
                mtime REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_file_hashes_hash ON file_hashes(hash);
            ",
        )?;

        conn.execute(
            "INSERT OR REPLACE INTO cache_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION],
        )?;

        Ok(state)
    }

    /// Location of the database file, `None` for an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// What the schema check found on open.
    #[must_use]
    pub fn schema_state(&self) -> &SchemaState {
        &self.schema_state
    }

    /// Read the stored schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn schema_version(&self) -> CacheResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM cache_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Load every record.
    ///
    /// Rows whose hash is not valid hex are dropped with a warning; the
    /// next build rehashes those files.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn load_all(&self) -> CacheResult<Vec<CacheRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, hash, size, mtime FROM file_hashes")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (path, hex, size, mtime) = row?;
            match hex_to_hash(&hex) {
                Some(hash) => records.push(CacheRecord::new(
                    path,
                    hash,
                    u64::try_from(size).unwrap_or_default(),
                    mtime,
                )),
                None => log::warn!("Dropping cache record with malformed hash: {}", path),
            }
        }
        Ok(records)
    }

    /// Look up one record by relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, relative_path: &str) -> CacheResult<Option<CacheRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT hash, size, mtime FROM file_hashes WHERE path = ?1",
                params![relative_path],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, f64>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.and_then(|(hex, size, mtime)| {
            hex_to_hash(&hex).map(|hash| {
                CacheRecord::new(
                    relative_path,
                    hash,
                    u64::try_from(size).unwrap_or_default(),
                    mtime,
                )
            })
        }))
    }

    /// Insert or replace one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn upsert(&self, record: &CacheRecord) -> CacheResult<()> {
        Self::upsert_with(&self.conn, record)
    }

    fn upsert_with(conn: &Connection, record: &CacheRecord) -> CacheResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO file_hashes (path, hash, size, mtime) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.relative_path,
                record.hash_hex(),
                i64::try_from(record.size).unwrap_or(i64::MAX),
                record.mtime
            ],
        )?;
        Ok(())
    }

    /// Delete one record. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn remove(&self, relative_path: &str) -> CacheResult<bool> {
        let n = self.conn.execute(
            "DELETE FROM file_hashes WHERE path = ?1",
            params![relative_path],
        )?;
        Ok(n > 0)
    }

    /// Apply a batch of upserts and removals in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; the transaction is rolled back.
    pub fn apply_batch(&mut self, upserts: &[CacheRecord], removals: &[String]) -> CacheResult<()> {
        if upserts.is_empty() && removals.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        for path in removals {
            tx.execute("DELETE FROM file_hashes WHERE path = ?1", params![path])?;
        }
        for record in upserts {
            Self::upsert_with(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn len(&self) -> CacheResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_hashes", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    /// Whether the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Delete every record, keeping the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn clear(&self) -> CacheResult<()> {
        self.conn.execute("DELETE FROM file_hashes", [])?;
        Ok(())
    }

    /// Flush and release the connection.
    ///
    /// # Errors
    ///
    /// Returns the error SQLite reported while closing.
    pub fn close(self) -> CacheResult<()> {
        self.conn.close().map_err(|(_, e)| CacheError::Database(e))
    }
}

/// The store file plus the sidecars SQLite may leave next to it.
#[must_use]
pub fn store_files(path: &Path) -> Vec<PathBuf> {
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-journal", "-wal", "-shm"] {
        let mut name = path.as_os_str().to_os_string();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}
