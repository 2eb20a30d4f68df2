//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the MarketLens
//! reference store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every entity of every kind, fields stored as a JSON object
CREATE TABLE IF NOT EXISTS entities (
    kind TEXT NOT NULL,
    id TEXT NOT NULL,
    fields TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (kind, id)
);

CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind);

-- Relations between entities (company -> intel record)
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_kind TEXT NOT NULL,
    from_id TEXT NOT NULL,
    relation TEXT NOT NULL,
    to_id TEXT NOT NULL,
    UNIQUE(from_kind, from_id, relation, to_id)
);

CREATE INDEX IF NOT EXISTS idx_links_from ON links(from_kind, from_id);
CREATE INDEX IF NOT EXISTS idx_links_to ON links(relation, to_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
