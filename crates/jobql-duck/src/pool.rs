//! Bounded DuckDB connection pool
//!
//! All connections are clones of one root connection, so they share the
//! same database (including an in-memory one). A semaphore bounds how many
//! are checked out at once; a connection goes back to the idle list when its
//! guard drops, whichever way the holder exits.

use std::ops::Deref;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use duckdb::Connection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

use crate::ExecutionError;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Database file; `None` opens an in-memory database
    pub path: Option<PathBuf>,

    /// Connections opened up front
    pub min_connections: usize,

    /// Upper bound on connections checked out at once
    pub max_connections: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            path: None,
            min_connections: 10,
            max_connections: 20,
        }
    }
}

struct PoolInner {
    root: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    max_connections: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panic while holding either lock cannot leave the data inconsistent
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PoolInner {
    fn checkout(&self) -> Result<Connection, ExecutionError> {
        if let Some(conn) = lock(&self.idle).pop() {
            return Ok(conn);
        }
        debug!("Opening new pooled connection");
        Ok(lock(&self.root).try_clone()?)
    }

    fn checkin(&self, conn: Connection) {
        lock(&self.idle).push(conn);
    }
}

#[derive(Clone)]
pub struct DuckPool {
    inner: Arc<PoolInner>,
}

impl DuckPool {
    pub fn open(config: &PoolConfig) -> Result<Self, ExecutionError> {
        if config.max_connections == 0 {
            return Err(ExecutionError::PoolConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let root = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        let prefill = config.min_connections.min(config.max_connections);
        let mut idle = Vec::with_capacity(config.max_connections);
        for _ in 0..prefill {
            idle.push(root.try_clone()?);
        }

        info!(
            path = ?config.path,
            min_connections = prefill,
            max_connections = config.max_connections,
            "Opened DuckDB connection pool"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                root: Mutex::new(root),
                idle: Mutex::new(idle),
                permits: Arc::new(Semaphore::new(config.max_connections)),
                max_connections: config.max_connections,
            }),
        })
    }

    /// Wait for a free slot and check out a connection.
    pub async fn acquire(&self) -> Result<PooledConnection, ExecutionError> {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExecutionError::PoolClosed)?;

        let conn = self.inner.checkout()?;

        Ok(PooledConnection {
            conn: Some(conn),
            pool: self.inner.clone(),
            _permit: permit,
        })
    }

    /// Refuse further checkouts. Connections already out finish normally.
    pub fn close(&self) {
        self.inner.permits.close();
    }

    pub fn max_connections(&self) -> usize {
        self.inner.max_connections
    }

    /// Slots not currently checked out
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    pub fn idle_connections(&self) -> usize {
        lock(&self.inner.idle).len()
    }
}

/// A checked-out connection; returns itself to the pool on drop.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection is held until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.checkin(conn);
        }
    }
}
