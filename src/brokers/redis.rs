//! Redis broker: queues are Redis lists, popped with `BLPOP`.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::brokers::Broker;
use crate::error::FlumeError;

/// How long one `BLPOP` round waits before re-issuing, in seconds.
///
/// Keeps the server-side block short so a dropped `pop` future leaves the
/// connection reusable almost immediately.
const POLL_QUANTUM_SECS: f64 = 1.0;

/// A broker backed by Redis lists.
///
/// Holds a [`MultiplexedConnection`], which is cloned per operation; all
/// clones share one TCP connection, so concurrent pops are safe.
///
/// Delivery is at-most-once: `BLPOP` removes the item server-side before the
/// reply is read, so a `pop` future dropped inside that window loses the item.
/// The short poll quantum keeps the window narrow; producers that cannot
/// tolerate the loss should re-enqueue on their own timeout.
#[derive(Clone)]
pub struct RedisBroker {
    conn: MultiplexedConnection,
}

impl RedisBroker {
    /// Connects to Redis at `url` (`redis://[:<password>@]<host>:<port>[/<db>]`).
    ///
    /// Fails Critical if the client cannot be created or the connection
    /// cannot be established.
    pub async fn connect(url: &str) -> Result<Self, FlumeError> {
        let client = redis::Client::open(url)
            .map_err(|e| FlumeError::critical(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| FlumeError::critical(format!("redis connect failed: {e}")))?;
        Ok(Self { conn })
    }

    /// Wraps a pre-built multiplexed connection.
    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn pop(&self, queue: &str) -> Result<String, FlumeError> {
        let mut conn = self.conn.clone();
        loop {
            let popped: Option<(String, String)> = conn
                .blpop(queue, POLL_QUANTUM_SECS)
                .await
                .map_err(|e| FlumeError::critical(format!("redis blpop failed: {e}")))?;
            if let Some((_key, payload)) = popped {
                return Ok(payload);
            }
        }
    }
}
