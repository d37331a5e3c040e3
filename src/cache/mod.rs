//! Content-addressed hash cache for the destination tree.
//!
//! This module provides persistent storage for file hashes so that repeated
//! runs only rehash files that changed since the last run.
//!
//! # Architecture
//!
//! The caching system is split into three components:
//!
//! * [`database`]: SQLite persistence, schema management and CRUD operations.
//! * [`entry`]: The record stored per file and its validation logic.
//! * [`index`]: The [`ContentIndex`] used by the organizer, which keeps an
//!   in-memory `hash -> paths` view consistent with the store.
//!
//! # Cache Invalidation
//!
//! Records are keyed by the path relative to the target root and validated
//! using the file size and modification time. If either changes, the record
//! is stale and the file is rehashed on the next build.

pub mod database;
pub mod entry;
pub mod index;

pub use database::{CacheError, CacheResult, HashCache, SchemaState, CACHE_FILE_NAME, SCHEMA_VERSION};
pub use entry::{relative_key, CacheRecord};
pub use index::{BuildStats, ContentIndex, IndexStats, StoreLocation};
