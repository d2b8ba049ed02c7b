//! # Store contracts.
//!
//! The dispatcher never talks to a concrete database. It sees two traits:
//! [`Connector`] opens physical connections, [`StoreConnection`] is one open
//! handle. Implementations own their transaction semantics: `finalize` must
//! commit if the connection is not in auto-commit mode.

use async_trait::async_trait;

use crate::error::FlumeError;
use crate::tasks::TaskStatus;

/// Opens physical connections to the durable store.
///
/// Failures are [`FlumeError::Critical`]: if the store cannot be reached, no
/// task can be processed or finalized.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a fresh connection.
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, FlumeError>;
}

/// One open connection to the durable store.
///
/// Owned exclusively: by the pool while idle, by exactly one processor while
/// in use. `Send` but not `Sync`: a connection is never shared.
#[async_trait]
pub trait StoreConnection: Send + 'static {
    /// Checks whether the connection is still usable.
    ///
    /// Called by the pool before reuse and by repair. Must not error: a
    /// connection that cannot even answer is simply not valid.
    async fn is_valid(&mut self) -> bool;

    /// Transactionally updates the task's durable record:
    /// status code, result blob (`None` if empty), error text (`None` on
    /// success), keyed by `id`.
    async fn finalize(
        &mut self,
        id: i64,
        status: TaskStatus,
        result: Option<&[u8]>,
        error: Option<&str>,
    ) -> Result<(), FlumeError>;
}
