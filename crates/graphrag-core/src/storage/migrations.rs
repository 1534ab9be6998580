//! Database Migrations
//!
//! A strictly ordered list of version-to-version upgrade steps. Each step
//! runs in its own transaction and appends a row to `schema_version`; the
//! current version lives in the `_schema_info` table.

use rusqlite::{Connection, params};

use crate::model::unix_now;

/// A single schema upgrade step.
#[derive(Debug, Clone)]
pub struct Migration {
    pub from_version: &'static str,
    pub to_version: &'static str,
    pub description: &'static str,
    /// SQL to apply, possibly multi-statement.
    pub script: &'static str,
}

/// The forward migration path, in order. `from_version` of each step must
/// equal `to_version` of the previous one.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        from_version: "1.0.0",
        to_version: "1.0.1",
        description: "Add query performance indexes",
        script: r#"
            CREATE INDEX IF NOT EXISTS idx_edges_strength ON edges(strength DESC);
            CREATE INDEX IF NOT EXISTS idx_nodes_updated_at ON nodes(updated_at DESC);
        "#,
    },
    Migration {
        from_version: "1.0.1",
        to_version: "1.0.2",
        description: "Add query log indexes",
        script: r#"
            CREATE INDEX IF NOT EXISTS idx_query_log_timestamp ON query_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_query_log_query_type ON query_log(query_type);
            CREATE INDEX IF NOT EXISTS idx_query_log_user_id ON query_log(user_id);
        "#,
    },
    Migration {
        from_version: "1.0.2",
        to_version: "1.0.3",
        description: "Add relationship traversal indexes",
        script: r#"
            CREATE INDEX IF NOT EXISTS idx_edges_source_type ON edges(source_id, type);
            CREATE INDEX IF NOT EXISTS idx_edges_target_type ON edges(target_id, type);
            CREATE INDEX IF NOT EXISTS idx_edges_strength_type ON edges(strength DESC, type);
        "#,
    },
    Migration {
        from_version: "1.0.3",
        to_version: "1.0.4",
        description: "Add update history indexes",
        script: r#"
            CREATE INDEX IF NOT EXISTS idx_update_history_entity_id ON update_history(entity_id);
            CREATE INDEX IF NOT EXISTS idx_update_history_timestamp ON update_history(timestamp);
            CREATE INDEX IF NOT EXISTS idx_update_history_operation ON update_history(operation);
        "#,
    },
];

/// The version a fully migrated database reports.
pub fn latest_version() -> &'static str {
    MIGRATIONS
        .last()
        .map(|m| m.to_version)
        .unwrap_or("1.0.0")
}

/// Read the recorded schema version from `_schema_info`.
pub fn current_version(conn: &Connection) -> rusqlite::Result<String> {
    conn.query_row(
        "SELECT value FROM _schema_info WHERE key = 'version'",
        [],
        |row| row.get(0),
    )
    .or(Ok("1.0.0".to_string()))
}

/// Apply every step whose `from_version` lies on the forward path from the
/// recorded version to `target`. Each step commits in its own transaction
/// and is recorded in `schema_version`. Returns the number of steps applied.
pub fn migrate_to(conn: &mut Connection, target: &str) -> rusqlite::Result<u32> {
    let mut current = current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.from_version != current {
            continue;
        }
        if migration.from_version >= target {
            break;
        }

        tracing::info!(
            "Applying migration {} -> {}: {}",
            migration.from_version,
            migration.to_version,
            migration.description
        );

        let tx = conn.transaction()?;
        tx.execute_batch(migration.script)?;
        tx.execute(
            "INSERT INTO schema_version (version, description, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.to_version, migration.description, unix_now()],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO _schema_info (key, value) VALUES ('version', ?1)",
            params![migration.to_version],
        )?;
        tx.commit()?;

        current = migration.to_version.to_string();
        applied += 1;

        if current == target {
            break;
        }
    }

    Ok(applied)
}

/// Rows of the append-only migration log, oldest first.
pub fn migration_history(
    conn: &Connection,
) -> rusqlite::Result<Vec<(String, String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT version, description, applied_at FROM schema_version ORDER BY applied_at, id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            row.get::<_, i64>(2)?,
        ))
    })?;
    rows.collect()
}

// ============================================================================
// TESTS
// ============================================================================
