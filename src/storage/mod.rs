//! Storage module for the intelligence graph
//!
//! This module holds the reference graph store used by the CLI and tests:
//! - SQLite database initialization and schema management
//! - Atomic application of replacement transaction lists
//! - Company lookup by normalized URL and linked-record snapshots

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{IntelStore, StorageError, StorageResult, StoredRecord};

use std::path::Path;

/// Initializes or opens a graph store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized store
/// * `Err(StorageError)` - Failed to open or initialize the database
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SqliteStore::open(path)
}
