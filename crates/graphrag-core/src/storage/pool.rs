//! Connection Pool
//!
//! A bounded pool of SQLite connections (default 5). Checkout hands back an
//! RAII guard that returns the connection on every exit path; when the pool
//! is empty a fresh connection is opened, and surplus connections are closed
//! on return instead of growing the pool.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Default per-connection busy timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 30_000;

/// Bounded SQLite connection pool. Readers run concurrently; the single
/// writer discipline is enforced by SQLite's WAL journal.
pub struct ConnectionPool {
    path: PathBuf,
    size: usize,
    timeout_ms: u32,
    idle: Mutex<Vec<Connection>>,
}

impl ConnectionPool {
    /// Create a pool over the database at `path`, pre-opening `size`
    /// connections.
    pub fn new(path: &Path, size: usize, timeout_ms: u32) -> rusqlite::Result<Self> {
        let pool = Self {
            path: path.to_path_buf(),
            size,
            timeout_ms,
            idle: Mutex::new(Vec::with_capacity(size)),
        };

        {
            let mut idle = pool
                .idle
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for _ in 0..size {
                idle.push(pool.connect()?);
            }
        }

        Ok(pool)
    }

    /// Open and configure a new connection.
    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = {};",
            self.timeout_ms
        ))?;
        Ok(conn)
    }

    /// Check out a connection, opening a fresh one when the pool is drained.
    pub fn get(&self) -> rusqlite::Result<PooledConnection<'_>> {
        let pooled = {
            let mut idle = self
                .idle
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            idle.pop()
        };

        let conn = match pooled {
            Some(conn) => conn,
            None => self.connect()?,
        };

        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
        })
    }

    fn put_back(&self, conn: Connection) {
        let mut idle = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if idle.len() < self.size {
            idle.push(conn);
        }
        // else: dropped here, closing the surplus connection
    }
}

/// Scoped connection checkout. Dereferences to [`Connection`] and returns it
/// to the pool on drop, including on panic or early-return paths.
pub struct PooledConnection<'p> {
    pool: &'p ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
