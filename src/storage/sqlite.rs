//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the IntelStore
//! trait. Entities live in one table as JSON field maps; links are rows.

use crate::ingest::{EntityKind, ExistingCompanyIntel, Fields, Transaction};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{IntelStore, StorageError, StorageResult, StoredRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite graph store
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteStore {
    /// Opens (or creates) a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Counts stored entities of one kind
    pub fn count(&self, kind: EntityKind) -> StorageResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Counts stored links
    pub fn count_links(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Returns every entity of one kind, ordered by id
    pub fn records_of_kind(&self, kind: EntityKind) -> StorageResult<Vec<StoredRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, fields FROM entities WHERE kind = ?1 ORDER BY id")?;

        let rows = stmt
            .query_map(params![kind.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, raw)| {
                Ok(StoredRecord {
                    kind,
                    id,
                    fields: decode_fields(&raw)?,
                })
            })
            .collect()
    }
}

impl IntelStore for SqliteStore {
    fn apply(&mut self, txns: &[Transaction]) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        for txn in txns {
            match txn {
                Transaction::Update { kind, id, fields } => {
                    let current: Option<String> = tx
                        .query_row(
                            "SELECT fields FROM entities WHERE kind = ?1 AND id = ?2",
                            params![kind.as_str(), id],
                            |row| row.get(0),
                        )
                        .optional()?;

                    let mut merged = match current {
                        Some(raw) => decode_fields(&raw)?,
                        None => Fields::new(),
                    };
                    merged.extend(fields.clone());

                    let encoded = serde_json::to_string(&merged)
                        .map_err(|e| StorageError::Serialization(e.to_string()))?;

                    tx.execute(
                        "INSERT INTO entities (kind, id, fields, updated_at) VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(kind, id) DO UPDATE SET fields = excluded.fields, updated_at = excluded.updated_at",
                        params![kind.as_str(), id, encoded, now],
                    )?;
                }

                Transaction::Delete { kind, id } => {
                    tx.execute(
                        "DELETE FROM entities WHERE kind = ?1 AND id = ?2",
                        params![kind.as_str(), id],
                    )?;
                    tx.execute(
                        "DELETE FROM links WHERE (relation = ?1 AND to_id = ?2)
                            OR (from_kind = ?1 AND from_id = ?2)",
                        params![kind.as_str(), id],
                    )?;
                }

                Transaction::Link {
                    from_kind,
                    from_id,
                    relation,
                    to_id,
                } => {
                    let from_exists: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM entities WHERE kind = ?1 AND id = ?2)",
                        params![from_kind.as_str(), from_id],
                        |row| row.get(0),
                    )?;
                    let to_exists: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM entities WHERE kind = ?1 AND id = ?2)",
                        params![relation, to_id],
                        |row| row.get(0),
                    )?;

                    if !from_exists || !to_exists {
                        // Dropping `tx` rolls back everything applied so far
                        return Err(StorageError::ConstraintViolation(format!(
                            "link {}/{} -[{}]-> {} references a missing entity",
                            from_kind, from_id, relation, to_id
                        )));
                    }

                    tx.execute(
                        "INSERT OR IGNORE INTO links (from_kind, from_id, relation, to_id)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![from_kind.as_str(), from_id, relation, to_id],
                    )?;
                }
            }
        }

        tx.commit()?;
        tracing::debug!("Applied {} transactions", txns.len());
        Ok(())
    }

    fn find_company_by_url(&self, normalized_url: &str) -> StorageResult<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM entities
                 WHERE kind = ?1 AND json_extract(fields, '$.url') = ?2
                 ORDER BY updated_at DESC LIMIT 1",
                params![EntityKind::Company.as_str(), normalized_url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn load_existing(&self, company_id: &str) -> StorageResult<Option<ExistingCompanyIntel>> {
        let Some(fields) = self.get_record(EntityKind::Company, company_id)? else {
            return Ok(None);
        };

        let url = fields
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let is_mine = fields
            .get("is_mine")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let mut existing = ExistingCompanyIntel::new(company_id, url).with_is_mine(is_mine);

        let mut stmt = self.conn.prepare(
            "SELECT relation, to_id FROM links WHERE from_kind = ?1 AND from_id = ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![EntityKind::Company.as_str(), company_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (relation, to_id) in rows {
            match relation.parse::<EntityKind>() {
                Ok(kind) => existing = existing.with_linked(kind, [to_id]),
                Err(e) => tracing::warn!("Ignoring link from company {}: {}", company_id, e),
            }
        }

        Ok(Some(existing))
    }

    fn linked_records(&self, company_id: &str, kind: EntityKind) -> StorageResult<Vec<StoredRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.id, e.fields FROM links l
             JOIN entities e ON e.kind = l.relation AND e.id = l.to_id
             WHERE l.from_kind = ?1 AND l.from_id = ?2 AND l.relation = ?3
             ORDER BY l.id",
        )?;

        let rows = stmt
            .query_map(
                params![EntityKind::Company.as_str(), company_id, kind.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, raw)| {
                Ok(StoredRecord {
                    kind,
                    id,
                    fields: decode_fields(&raw)?,
                })
            })
            .collect()
    }

    fn get_record(&self, kind: EntityKind, id: &str) -> StorageResult<Option<Fields>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT fields FROM entities WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|raw| decode_fields(&raw)).transpose()
    }
}

fn decode_fields(raw: &str) -> StorageResult<Fields> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}
