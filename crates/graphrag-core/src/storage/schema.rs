//! Database Schema
//!
//! Declares every table and index of the knowledge graph store, plus the
//! verification pass that runs at open.

use rusqlite::Connection;

/// Base schema, applied idempotently at every open. Versioned changes on top
/// of this live in [`super::migrations`].
pub const SCHEMA: &str = r#"
-- Nodes (entities in the graph)
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    description TEXT,
    category TEXT,
    keywords TEXT,
    metadata TEXT,
    created_at INTEGER,
    updated_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_nodes_category ON nodes(category);
CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);
CREATE INDEX IF NOT EXISTS idx_nodes_created_at ON nodes(created_at);

-- Edges (directed relationships between nodes)
CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    type TEXT NOT NULL,
    strength REAL DEFAULT 1.0,
    metadata TEXT,
    created_at INTEGER,
    FOREIGN KEY(source_id) REFERENCES nodes(id) ON DELETE CASCADE,
    FOREIGN KEY(target_id) REFERENCES nodes(id) ON DELETE CASCADE,
    UNIQUE(source_id, target_id, type)
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(type);
CREATE INDEX IF NOT EXISTS idx_edges_source_target ON edges(source_id, target_id);
CREATE INDEX IF NOT EXISTS idx_edges_created_at ON edges(created_at);

-- Embeddings (one vector per node, packed little-endian f32)
CREATE TABLE IF NOT EXISTS embeddings (
    id TEXT PRIMARY KEY,
    node_id TEXT NOT NULL UNIQUE,
    embedding BLOB NOT NULL,
    dimension INTEGER NOT NULL,
    model TEXT NOT NULL,
    created_at INTEGER,
    updated_at INTEGER,
    FOREIGN KEY(node_id) REFERENCES nodes(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_embeddings_node_id ON embeddings(node_id);
CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model);

-- Graph metadata (build info and counters)
CREATE TABLE IF NOT EXISTS graph_metadata (
    key TEXT PRIMARY KEY,
    value TEXT,
    updated_at INTEGER
);

-- Query log (latency and result-count observability)
CREATE TABLE IF NOT EXISTS query_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    query_type TEXT,
    latency_ms INTEGER,
    result_count INTEGER,
    timestamp INTEGER,
    user_id TEXT
);

-- Update history (audit trail, written inside mutation transactions)
CREATE TABLE IF NOT EXISTS update_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    operation TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    timestamp INTEGER,
    source TEXT
);

-- Schema version history (append-only migration log)
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version TEXT NOT NULL,
    description TEXT,
    applied_at INTEGER
);

-- Schema bookkeeping
CREATE TABLE IF NOT EXISTS _schema_info (
    key TEXT PRIMARY KEY,
    value TEXT
);

INSERT OR IGNORE INTO _schema_info (key, value) VALUES ('version', '1.0.0');
INSERT OR IGNORE INTO _schema_info (key, value) VALUES ('created_at', strftime('%s', 'now'));
"#;

/// Every table the declared schema names. A missing entry fails the open.
pub const REQUIRED_TABLES: &[&str] = &[
    "nodes",
    "edges",
    "embeddings",
    "graph_metadata",
    "query_log",
    "update_history",
    "schema_version",
    "_schema_info",
];

/// Check that every declared table exists. Returns the missing table names,
/// empty when the schema is intact.
pub fn missing_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let existing: std::collections::HashSet<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(REQUIRED_TABLES
        .iter()
        .filter(|t| !existing.contains(**t))
        .map(|t| t.to_string())
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_required_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(missing_tables(&conn).unwrap().is_empty());
    }

    #[test]
    fn empty_database_reports_missing_tables() {
        let conn = Connection::open_in_memory().unwrap();
        let missing = missing_tables(&conn).unwrap();
        assert_eq!(missing.len(), REQUIRED_TABLES.len());
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let version: String = conn
            .query_row(
                "SELECT value FROM _schema_info WHERE key = 'version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, "1.0.0");
    }
}
