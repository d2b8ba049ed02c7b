//! # Bounded connection pool.
//!
//! [`ConnectionPool`] owns up to `capacity` store connections. Physical
//! connections are opened lazily: acquiring from an empty idle set dials the
//! store, releasing returns the handle for reuse.
//!
//! ## Rules
//! - `acquire` blocks (cancel-safely) when all slots are in use; this is a
//!   supplier/processor suspension point.
//! - `release` never fails.
//! - `repair` validates a suspect connection and transparently reconnects;
//!   only an unreachable store makes it fail, and that is Critical.
//! - All internal state sits behind a semaphore and a mutex; acquire,
//!   release, and repair are safe to call concurrently from any number of
//!   processors.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::FlumeError;
use crate::pool::{Connector, StoreConnection};

/// A connection checked out of the pool.
///
/// Holds the slot permit for as long as the connection is out; dropping the
/// guard frees the slot but discards the physical connection, so the normal
/// path is to hand it back via [`ConnectionPool::release`].
pub struct PooledConnection {
    conn: Box<dyn StoreConnection>,
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection").finish_non_exhaustive()
    }
}

impl PooledConnection {
    /// The underlying store connection.
    pub fn store(&mut self) -> &mut dyn StoreConnection {
        self.conn.as_mut()
    }
}

/// Bounded pool of store connections with repair semantics.
pub struct ConnectionPool {
    connector: Arc<dyn Connector>,
    idle: Mutex<Vec<Box<dyn StoreConnection>>>,
    slots: Arc<Semaphore>,
}

impl ConnectionPool {
    /// Creates a pool that will keep at most `capacity` connections open.
    pub fn new(connector: Arc<dyn Connector>, capacity: usize) -> Self {
        Self {
            connector,
            idle: Mutex::new(Vec::with_capacity(capacity)),
            slots: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Acquires a connection, waiting for a free slot if necessary.
    ///
    /// Reuses an idle connection when one exists, otherwise opens a fresh
    /// one. Fails with [`FlumeError::Critical`] if no connection can be
    /// established.
    pub async fn acquire(&self) -> Result<PooledConnection, FlumeError> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FlumeError::critical("connection pool is closed"))?;

        let reused = self.idle.lock().await.pop();
        let conn = match reused {
            Some(conn) => conn,
            // Permit is dropped on error, freeing the slot.
            None => self.connector.connect().await?,
        };

        Ok(PooledConnection {
            conn,
            _permit: permit,
        })
    }

    /// Returns a connection to the idle set. Never fails.
    pub async fn release(&self, pooled: PooledConnection) {
        let PooledConnection { conn, _permit } = pooled;
        self.idle.lock().await.push(conn);
        // _permit drops here, after the handle is back in the idle set.
    }

    /// Validates a suspect connection, reconnecting transparently if needed.
    ///
    /// The returned guard keeps the caller's slot. Fails with
    /// [`FlumeError::Critical`] only when the store itself is unreachable; the
    /// broken physical connection is discarded either way.
    pub async fn repair(&self, mut pooled: PooledConnection) -> Result<PooledConnection, FlumeError> {
        if pooled.conn.is_valid().await {
            return Ok(pooled);
        }
        debug!("replacing broken store connection");
        let PooledConnection { conn, _permit } = pooled;
        drop(conn);
        let fresh = self.connector.connect().await?;
        Ok(PooledConnection {
            conn: fresh,
            _permit,
        })
    }
}
