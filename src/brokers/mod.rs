//! Message brokers: blocking string queues the broker supplier pops from.
//!
//! A broker holds named queues of raw payloads pushed by external producers.
//! [`Broker::pop`] blocks until an item is available; decode and dispatch are
//! the supplier's job, so a broker knows nothing about tasks.
//!
//! - [`MemoryBroker`]: in-process queues, used by tests and embedders;
//! - `RedisBroker`: Redis lists via `BLPOP` (behind the `redis` feature).

mod memory;
#[cfg(feature = "redis")]
mod redis;

use async_trait::async_trait;

use crate::error::FlumeError;

pub use memory::MemoryBroker;
#[cfg(feature = "redis")]
pub use redis::RedisBroker;

/// One broker backend.
///
/// ## Rules
/// - `pop` blocks until an item arrives on `queue` and must tolerate being
///   dropped before it resolves (the supplier races it against cancellation).
///   Whether a drop can lose an in-flight item is backend-specific:
///   [`MemoryBroker`] never loses one; a networked backend may drop the item
///   its server already removed (see `RedisBroker`).
/// - A backend that cannot be reached fails Critical; the supplier's retry
///   policy takes it from there.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Removes and returns the oldest item on `queue`, waiting for one if the
    /// queue is empty.
    async fn pop(&self, queue: &str) -> Result<String, FlumeError>;
}
