//! Connection pooling with repair semantics.
//!
//! The pool is the only resource shared across suppliers and processors. It
//! owns a bounded set of store connections, hands them out one owner at a
//! time, and transparently replaces connections the store has broken.
//!
//! The underlying store is out of scope and appears only as the
//! [`Connector`]/[`StoreConnection`] contracts.

mod connection;
mod pool;

pub use connection::{Connector, StoreConnection};
pub use pool::{ConnectionPool, PooledConnection};
