//! Database schema definitions for the progress ledger
//!
//! This module contains all SQL schema definitions for the Catalog-Harvest
//! ledger database.

/// SQL schema for the ledger database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per identifier that has ever been attempted
CREATE TABLE IF NOT EXISTS products (
    identifier TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    failure_kind TEXT,
    attempts INTEGER NOT NULL DEFAULT 0,
    first_seen_run INTEGER NOT NULL REFERENCES runs(id),
    last_attempt_at TEXT,
    message TEXT
);

CREATE INDEX IF NOT EXISTS idx_products_state ON products(state);
"#;

/// Initializes the ledger schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
