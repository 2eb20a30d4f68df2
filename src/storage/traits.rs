//! Storage traits and error types
//!
//! This module defines the trait interface for intelligence graph stores and
//! associated error types.

use crate::ingest::{EntityKind, ExistingCompanyIntel, Fields, Transaction};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One stored entity
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub kind: EntityKind,
    pub id: String,
    pub fields: Fields,
}

/// Trait for graph store implementations
///
/// The ingestion pipeline only ever writes through [`IntelStore::apply`], so
/// a company's graph is either fully replaced or left untouched.
pub trait IntelStore {
    /// Applies a transaction list atomically
    ///
    /// Either every transaction takes effect or none does.
    fn apply(&mut self, txns: &[Transaction]) -> StorageResult<()>;

    /// Finds a company by its normalized URL
    ///
    /// # Returns
    ///
    /// The company id, or None if no company has this URL
    fn find_company_by_url(&self, normalized_url: &str) -> StorageResult<Option<String>>;

    /// Snapshots the ids currently linked to a company
    fn load_existing(&self, company_id: &str) -> StorageResult<Option<ExistingCompanyIntel>>;

    /// Gets the records of one kind linked to a company, in link order
    fn linked_records(&self, company_id: &str, kind: EntityKind) -> StorageResult<Vec<StoredRecord>>;

    /// Gets one entity's fields
    fn get_record(&self, kind: EntityKind, id: &str) -> StorageResult<Option<Fields>>;
}
