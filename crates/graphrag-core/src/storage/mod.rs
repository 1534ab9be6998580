//! Storage Engine
//!
//! Owns the on-disk SQLite database and every connection to it. Higher
//! layers hold no persistent state of their own; all graph references are
//! string ids resolved through this module.
//!
//! Every mutation runs in a transaction that also journals one row into
//! `update_history` - either both writes land or neither does.

pub mod migrations;
pub mod pool;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{OptionalExtension, Transaction, params};
use serde::{Deserialize, Serialize};

use crate::model::{
    Edge, EdgeMetadata, Embedding, EntityType, Node, NodeMetadata, QueryLog, QueryType,
    RelationshipType, UpdateHistoryEntry, unix_now,
};
use pool::{ConnectionPool, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT_MS};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Typed storage failure. Operations never panic on corrupt inputs.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Entity not found
    #[error("not found: {0}")]
    NotFound(String),
    /// Uniqueness or reference conflict
    #[error("conflict: {0}")]
    Conflict(String),
    /// Caller-supplied value out of range or malformed
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Schema verification failure or undecodable stored state
    #[error("corrupt state: {0}")]
    CorruptState(String),
    /// Underlying database failure (including lock timeouts)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StoreError>;

fn map_constraint(err: rusqlite::Error, what: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Database(err),
    }
}

// ============================================================================
// STATS
// ============================================================================

/// Diagnostic snapshot returned by [`GraphStore::get_stats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub node_count: i64,
    pub edge_count: i64,
    pub db_size_mb: f64,
    pub version: String,
    pub metadata: BTreeMap<String, String>,
}

// ============================================================================
// GRAPH STORE
// ============================================================================

/// SQLite-backed store for nodes, edges, embeddings, and bookkeeping tables.
///
/// All methods take `&self`; the connection pool provides interior
/// mutability, so the store can be shared behind an `Arc` across the query
/// engines.
pub struct GraphStore {
    pool: ConnectionPool,
    path: PathBuf,
    version: String,
}

impl GraphStore {
    /// Open (or create) the database at `path` with default pool settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT_MS)
    }

    /// Open with an explicit pool size and per-connection busy timeout.
    ///
    /// Applies the base schema, runs pending migrations, and verifies that
    /// every declared table exists. A failed verification is fatal.
    pub fn open_with(path: impl AsRef<Path>, pool_size: usize, timeout_ms: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::new(&path, pool_size, timeout_ms)?;

        let version = {
            let mut conn = pool.get()?;
            conn.execute_batch(schema::SCHEMA)?;
            migrations::migrate_to(&mut conn, migrations::latest_version())?;

            let missing = schema::missing_tables(&conn)?;
            if !missing.is_empty() {
                return Err(StoreError::CorruptState(format!(
                    "schema verification failed, missing tables: {}",
                    missing.join(", ")
                )));
            }

            migrations::current_version(&conn)?
        };

        tracing::info!("Graph store opened at {} (schema {})", path.display(), version);

        Ok(Self {
            pool,
            path,
            version,
        })
    }

    /// Recorded schema version at open time.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Run `f` inside a transaction; commit on success, roll back on failure.
    fn with_txn<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                // Dropping the transaction rolls it back
                Err(e)
            }
        }
    }

    /// Journal one mutation into `update_history` within the caller's
    /// transaction.
    fn log_update(
        tx: &Transaction,
        entity_id: &str,
        entity_type: EntityType,
        operation: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) -> Result<()> {
        tx.execute(
            "INSERT INTO update_history
             (entity_id, entity_type, operation, old_value, new_value, timestamp, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'api')",
            params![
                entity_id,
                entity_type.as_str(),
                operation,
                old_value,
                new_value,
                unix_now(),
            ],
        )?;
        Ok(())
    }

    // ========================================================================
    // NODE OPERATIONS
    // ========================================================================

    /// Idempotent upsert keyed on the node id. Timestamps are filled in when
    /// absent.
    pub fn add_node(&self, node: &Node) -> Result<()> {
        self.with_txn(|tx| Self::upsert_node(tx, node))
    }

    fn upsert_node(tx: &Transaction, node: &Node) -> Result<()> {
        if node.id.is_empty() {
            return Err(StoreError::InvalidInput("node id is empty".to_string()));
        }

        let now = unix_now();
        let keywords = serde_json::to_string(&node.keywords)
            .map_err(|e| StoreError::InvalidInput(format!("unserializable keywords: {e}")))?;
        let metadata = serde_json::to_string(&node.metadata)
            .map_err(|e| StoreError::InvalidInput(format!("unserializable metadata: {e}")))?;

        tx.execute(
            "INSERT OR REPLACE INTO nodes
             (id, label, description, category, keywords, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                node.id,
                node.label,
                node.description,
                node.category,
                keywords,
                metadata,
                node.created_at.unwrap_or(now),
                node.updated_at.unwrap_or(now),
            ],
        )?;

        let new_value = serde_json::json!({"label": node.label}).to_string();
        Self::log_update(tx, &node.id, EntityType::Node, "add", None, Some(&new_value))
    }

    /// Upsert a node and (optionally) its embedding in a single transaction.
    pub fn add_node_with_embedding(
        &self,
        node: &Node,
        embedding: Option<&Embedding>,
    ) -> Result<()> {
        self.with_txn(|tx| {
            Self::upsert_node(tx, node)?;
            if let Some(embedding) = embedding {
                Self::upsert_embedding(tx, embedding)?;
            }
            Ok(())
        })
    }

    pub fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT * FROM nodes WHERE id = ?1")?;
        let node = stmt
            .query_row(params![id], Self::row_to_node)
            .optional()?;
        Ok(node)
    }

    /// Paginated node listing, newest first. A negative limit returns all
    /// rows.
    pub fn get_nodes(&self, limit: i64, offset: i64) -> Result<Vec<Node>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM nodes ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], Self::row_to_node)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    pub fn get_nodes_by_category(&self, category: &str) -> Result<Vec<Node>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT * FROM nodes WHERE category = ?1 ORDER BY label")?;
        let rows = stmt.query_map(params![category], Self::row_to_node)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Delete a node; incident edges and its embedding cascade away with it.
    pub fn delete_node(&self, id: &str) -> Result<bool> {
        self.with_txn(|tx| {
            let rows = tx.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
            if rows > 0 {
                Self::log_update(tx, id, EntityType::Node, "delete", Some("{}"), None)?;
            }
            Ok(rows > 0)
        })
    }

    pub fn node_count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?)
    }

    // ========================================================================
    // EDGE OPERATIONS
    // ========================================================================

    /// Idempotent upsert keyed on the edge id. `(source, target, kind)` stays
    /// unique; a re-add under a new id replaces the old row.
    pub fn add_edge(&self, edge: &Edge) -> Result<()> {
        if !(0.0..=1.0).contains(&edge.strength) {
            return Err(StoreError::InvalidInput(format!(
                "edge strength {} outside [0, 1]",
                edge.strength
            )));
        }

        self.with_txn(|tx| {
            let metadata = serde_json::to_string(&edge.metadata)
                .map_err(|e| StoreError::InvalidInput(format!("unserializable metadata: {e}")))?;

            tx.execute(
                "INSERT OR REPLACE INTO edges
                 (id, source_id, target_id, type, strength, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    edge.id,
                    edge.source_id,
                    edge.target_id,
                    edge.kind.as_str(),
                    edge.strength,
                    metadata,
                    edge.created_at.unwrap_or(unix_now()),
                ],
            )
            .map_err(|e| {
                map_constraint(e, "edge endpoints must reference existing nodes")
            })?;

            let new_value = serde_json::json!({
                "type": edge.kind.as_str(),
                "strength": edge.strength,
            })
            .to_string();
            Self::log_update(tx, &edge.id, EntityType::Node, "add_edge", None, Some(&new_value))
        })
    }

    /// Outgoing edges, strongest first.
    pub fn get_edges_from_node(&self, source_id: &str) -> Result<Vec<Edge>> {
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare("SELECT * FROM edges WHERE source_id = ?1 ORDER BY strength DESC")?;
        let rows = stmt.query_map(params![source_id], Self::row_to_edge)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    /// Incoming edges, strongest first.
    pub fn get_edges_to_node(&self, target_id: &str) -> Result<Vec<Edge>> {
        let conn = self.pool.get()?;
        let mut stmt = conn
            .prepare("SELECT * FROM edges WHERE target_id = ?1 ORDER BY strength DESC")?;
        let rows = stmt.query_map(params![target_id], Self::row_to_edge)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    pub fn delete_edge(&self, id: &str) -> Result<bool> {
        self.with_txn(|tx| {
            let rows = tx.execute("DELETE FROM edges WHERE id = ?1", params![id])?;
            if rows > 0 {
                Self::log_update(tx, id, EntityType::Node, "delete_edge", Some("{}"), None)?;
            }
            Ok(rows > 0)
        })
    }

    pub fn edge_count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?)
    }

    // ========================================================================
    // EMBEDDING OPERATIONS
    // ========================================================================

    /// Upsert the embedding for a node (one vector per node).
    pub fn add_embedding(&self, embedding: &Embedding) -> Result<()> {
        self.with_txn(|tx| Self::upsert_embedding(tx, embedding))
    }

    fn upsert_embedding(tx: &Transaction, embedding: &Embedding) -> Result<()> {
        if embedding.vector.is_empty() {
            return Err(StoreError::InvalidInput(
                "embedding vector is empty".to_string(),
            ));
        }
        if embedding.vector.len() != embedding.dimension {
            return Err(StoreError::InvalidInput(format!(
                "embedding dimension {} does not match vector length {}",
                embedding.dimension,
                embedding.vector.len()
            )));
        }

        let now = unix_now();
        tx.execute(
            "INSERT OR REPLACE INTO embeddings
             (id, node_id, embedding, dimension, model, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                embedding.id,
                embedding.node_id,
                embedding.to_bytes(),
                embedding.dimension as i64,
                embedding.model,
                embedding.created_at.unwrap_or(now),
                embedding.updated_at.unwrap_or(now),
            ],
        )
        .map_err(|e| map_constraint(e, "embedding must reference an existing node"))?;
        Ok(())
    }

    pub fn get_embedding(&self, node_id: &str) -> Result<Option<Embedding>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT * FROM embeddings WHERE node_id = ?1")?;
        let embedding = stmt
            .query_row(params![node_id], Self::row_to_embedding)
            .optional()?;

        // Reject silently truncated blobs instead of returning garbage
        if let Some(ref emb) = embedding
            && emb.vector.len() != emb.dimension
        {
            return Err(StoreError::CorruptState(format!(
                "embedding for {} has {} floats, expected {}",
                node_id,
                emb.vector.len(),
                emb.dimension
            )));
        }

        Ok(embedding)
    }

    /// Dimension of the stored embeddings, if any exist.
    pub fn embedding_dimension(&self) -> Result<Option<usize>> {
        let conn = self.pool.get()?;
        let dim: Option<i64> = conn
            .query_row("SELECT dimension FROM embeddings LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(dim.map(|d| d as usize))
    }

    // ========================================================================
    // METADATA OPERATIONS
    // ========================================================================

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.with_txn(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO graph_metadata (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, unix_now()],
            )?;
            Ok(())
        })
    }

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row(
                "SELECT value FROM graph_metadata WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn get_all_metadata(&self) -> Result<BTreeMap<String, String>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT key, value FROM graph_metadata")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .map_err(StoreError::from)
    }

    // ========================================================================
    // QUERY LOG
    // ========================================================================

    pub fn log_query(&self, log: &QueryLog) -> Result<()> {
        self.with_txn(|tx| {
            tx.execute(
                "INSERT INTO query_log
                 (query, query_type, latency_ms, result_count, timestamp, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    log.query,
                    log.query_type.map(|t| t.as_str()),
                    log.latency_ms,
                    log.result_count,
                    log.timestamp.unwrap_or(unix_now()),
                    log.user_id,
                ],
            )?;
            Ok(())
        })
    }

    /// Recent query log rows, newest first.
    pub fn get_query_logs(&self, limit: i64) -> Result<Vec<QueryLog>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT * FROM query_log ORDER BY timestamp DESC, id DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit], |row| {
            let query_type: Option<String> = row.get("query_type")?;
            Ok(QueryLog {
                id: row.get("id")?,
                query: row.get("query")?,
                query_type: query_type.as_deref().and_then(QueryType::parse_name),
                latency_ms: row.get("latency_ms")?,
                result_count: row.get("result_count")?,
                timestamp: row.get("timestamp")?,
                user_id: row.get("user_id")?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }

    // ========================================================================
    // UPDATE HISTORY
    // ========================================================================

    /// Audit trail rows, newest first, optionally filtered to one entity.
    pub fn get_update_history(
        &self,
        entity_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<UpdateHistoryEntry>> {
        let conn = self.pool.get()?;

        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<UpdateHistoryEntry> {
            let entity_type: String = row.get("entity_type")?;
            Ok(UpdateHistoryEntry {
                id: row.get("id")?,
                entity_id: row.get("entity_id")?,
                entity_type: EntityType::parse_name(&entity_type),
                operation: row.get("operation")?,
                old_value: row.get("old_value")?,
                new_value: row.get("new_value")?,
                timestamp: row.get("timestamp")?,
                source: row.get::<_, Option<String>>("source")?.unwrap_or_default(),
            })
        };

        let entries = match entity_id {
            Some(entity_id) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM update_history WHERE entity_id = ?1
                     ORDER BY timestamp DESC, id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![entity_id, limit], map_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM update_history ORDER BY timestamp DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], map_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        Ok(entries)
    }

    // ========================================================================
    // DIAGNOSTICS
    // ========================================================================

    pub fn get_stats(&self) -> Result<StoreStats> {
        let db_size_mb = std::fs::metadata(&self.path)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);

        Ok(StoreStats {
            node_count: self.node_count()?,
            edge_count: self.edge_count()?,
            db_size_mb,
            version: self.version.clone(),
            metadata: self.get_all_metadata()?,
        })
    }

    /// Explicit, operator-triggered space reclamation. Never runs implicitly.
    pub fn vacuum(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute_batch("VACUUM")?;
        Ok(())
    }

    // ========================================================================
    // ROW CONVERSION
    // ========================================================================

    fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<Node> {
        let keywords_json: Option<String> = row.get("keywords")?;
        let keywords: Vec<String> = keywords_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        let metadata_json: Option<String> = row.get("metadata")?;
        let metadata: NodeMetadata = metadata_json
            .as_deref()
            .and_then(|s| {
                serde_json::from_str(s)
                    .map_err(|e| tracing::warn!("undecodable node metadata: {}", e))
                    .ok()
            })
            .unwrap_or_default();

        Ok(Node {
            id: row.get("id")?,
            label: row.get("label")?,
            description: row.get("description")?,
            category: row.get("category")?,
            keywords,
            metadata,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
        let kind_str: String = row.get("type")?;
        let kind: RelationshipType = kind_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        let metadata_json: Option<String> = row.get("metadata")?;
        let metadata: EdgeMetadata = metadata_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        Ok(Edge {
            id: row.get("id")?,
            source_id: row.get("source_id")?,
            target_id: row.get("target_id")?,
            kind,
            strength: row.get("strength")?,
            metadata,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_embedding(row: &rusqlite::Row) -> rusqlite::Result<Embedding> {
        let bytes: Vec<u8> = row.get("embedding")?;
        let vector = Embedding::vector_from_bytes(&bytes).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Blob,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "embedding blob length is not a multiple of 4",
                )),
            )
        })?;

        Ok(Embedding {
            id: row.get("id")?,
            node_id: row.get("node_id")?,
            vector,
            dimension: row.get::<_, i64>("dimension")? as usize,
            model: row.get("model")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationshipType;

    fn open_store() -> (tempfile::TempDir, GraphStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.db")).unwrap();
        (dir, store)
    }

    fn sample_node(id: &str, label: &str) -> Node {
        let mut node = Node::new(id, label);
        node.description = Some(format!("{label} integration"));
        node.keywords = vec![label.to_lowercase()];
        node
    }

    #[test]
    fn open_runs_migrations_to_latest() {
        let (_dir, store) = open_store();
        assert_eq!(store.version(), migrations::latest_version());
    }

    #[test]
    fn add_and_get_node_roundtrip() {
        let (_dir, store) = open_store();

        let mut node = sample_node("nodes-base.slack", "Slack");
        node.category = Some("Communication".to_string());
        node.metadata.use_cases = vec!["send alerts".to_string()];
        node.metadata
            .extra
            .insert("complexity".to_string(), serde_json::json!("low"));
        store.add_node(&node).unwrap();

        let fetched = store.get_node("nodes-base.slack").unwrap().unwrap();
        assert_eq!(fetched.label, node.label);
        assert_eq!(fetched.description, node.description);
        assert_eq!(fetched.category, node.category);
        assert_eq!(fetched.keywords, node.keywords);
        assert_eq!(fetched.metadata, node.metadata);
        assert!(fetched.created_at.is_some());
    }

    #[test]
    fn add_node_is_idempotent() {
        let (_dir, store) = open_store();
        let node = sample_node("a", "A");

        store.add_node(&node).unwrap();
        store.add_node(&node).unwrap();
        assert_eq!(store.node_count().unwrap(), 1);
    }

    #[test]
    fn get_nodes_by_category_filters() {
        let (_dir, store) = open_store();

        let mut slack = sample_node("slack", "Slack");
        slack.category = Some("Communication".to_string());
        store.add_node(&slack).unwrap();
        store.add_node(&sample_node("http", "HTTP Request")).unwrap();
        store.add_node(&sample_node("set", "Set")).unwrap();

        let communication = store.get_nodes_by_category("Communication").unwrap();
        assert_eq!(communication.len(), 1);
        assert_eq!(communication[0].id, "slack");
    }

    #[test]
    fn edges_visible_from_both_endpoints() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("http", "HTTP Request")).unwrap();
        store.add_node(&sample_node("slack", "Slack")).unwrap();

        let edge = Edge::new("http", "slack", RelationshipType::CompatibleWith, 0.95);
        store.add_edge(&edge).unwrap();

        let from = store.get_edges_from_node("http").unwrap();
        assert_eq!(from.len(), 1);
        assert_eq!(from[0].target_id, "slack");

        let to = store.get_edges_to_node("slack").unwrap();
        assert_eq!(to.len(), 1);
        assert_eq!(to[0].id, edge.id);
    }

    #[test]
    fn add_edge_is_idempotent() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();
        store.add_node(&sample_node("b", "B")).unwrap();

        let edge = Edge::new("a", "b", RelationshipType::Requires, 0.8);
        store.add_edge(&edge).unwrap();
        store.add_edge(&edge).unwrap();
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn edge_source_target_kind_stays_unique() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();
        store.add_node(&sample_node("b", "B")).unwrap();

        store
            .add_edge(&Edge::new("a", "b", RelationshipType::Solves, 0.5))
            .unwrap();
        store
            .add_edge(&Edge::new("a", "b", RelationshipType::Solves, 0.9))
            .unwrap();

        let edges = store.get_edges_from_node("a").unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].strength, 0.9);
    }

    #[test]
    fn edge_strength_out_of_range_is_invalid() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();
        store.add_node(&sample_node("b", "B")).unwrap();

        let edge = Edge::new("a", "b", RelationshipType::Solves, 1.5);
        assert!(matches!(
            store.add_edge(&edge),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn edge_to_missing_node_is_a_conflict() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();

        let edge = Edge::new("a", "ghost", RelationshipType::Solves, 0.5);
        assert!(matches!(
            store.add_edge(&edge),
            Err(StoreError::Conflict(_))
        ));
        // Rolled back: no history row for the failed edge
        let history = store.get_update_history(Some(&edge.id), 10).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn delete_node_cascades_edges_and_embedding() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();
        store.add_node(&sample_node("b", "B")).unwrap();
        store
            .add_edge(&Edge::new("a", "b", RelationshipType::SimilarTo, 0.7))
            .unwrap();
        store
            .add_embedding(&Embedding::new("a", vec![0.1; 8], "all-MiniLM-L6-v2"))
            .unwrap();

        assert!(store.delete_node("a").unwrap());
        assert!(store.get_node("a").unwrap().is_none());
        assert!(store.get_edges_to_node("b").unwrap().is_empty());
        assert!(store.get_embedding("a").unwrap().is_none());
        assert!(!store.delete_node("a").unwrap());
    }

    #[test]
    fn embedding_roundtrip_preserves_bytes() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();

        let vector = vec![0.25_f32, -1.0, 3.5, f32::EPSILON];
        let embedding = Embedding::new("a", vector.clone(), "all-MiniLM-L6-v2");
        store.add_embedding(&embedding).unwrap();

        let fetched = store.get_embedding("a").unwrap().unwrap();
        assert_eq!(fetched.dimension, 4);
        assert_eq!(fetched.model, "all-MiniLM-L6-v2");
        for (a, b) in fetched.vector.iter().zip(vector.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(store.embedding_dimension().unwrap(), Some(4));
    }

    #[test]
    fn mutations_journal_update_history() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();
        store.add_node(&sample_node("b", "B")).unwrap();
        let edge = Edge::new("a", "b", RelationshipType::Requires, 1.0);
        store.add_edge(&edge).unwrap();
        store.delete_edge(&edge.id).unwrap();
        store.delete_node("a").unwrap();

        let history = store.get_update_history(None, 50).unwrap();
        let operations: Vec<&str> = history.iter().map(|h| h.operation.as_str()).collect();
        assert!(operations.contains(&"add"));
        assert!(operations.contains(&"add_edge"));
        assert!(operations.contains(&"delete_edge"));
        assert!(operations.contains(&"delete"));
        assert!(history.iter().all(|h| h.source == "api"));
    }

    #[test]
    fn metadata_and_query_log_roundtrip() {
        let (_dir, store) = open_store();

        store.set_metadata("embedding_model", "all-MiniLM-L6-v2").unwrap();
        store.set_metadata("build", "2026-08-01").unwrap();
        assert_eq!(
            store.get_metadata("embedding_model").unwrap().as_deref(),
            Some("all-MiniLM-L6-v2")
        );
        assert_eq!(store.get_all_metadata().unwrap().len(), 2);

        let mut log = QueryLog::new("send message", QueryType::KeywordSearch);
        log.latency_ms = Some(4);
        log.result_count = Some(3);
        store.log_query(&log).unwrap();

        let logs = store.get_query_logs(10).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].query, "send message");
        assert_eq!(logs[0].query_type, Some(QueryType::KeywordSearch));
    }

    #[test]
    fn stats_report_counts_and_version() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.node_count, 1);
        assert_eq!(stats.edge_count, 0);
        assert_eq!(stats.version, migrations::latest_version());
    }

    #[test]
    fn vacuum_succeeds() {
        let (_dir, store) = open_store();
        store.add_node(&sample_node("a", "A")).unwrap();
        store.delete_node("a").unwrap();
        store.vacuum().unwrap();
    }
}
