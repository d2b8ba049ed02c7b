//! # Script-execution contract.
//!
//! The interpreter that actually runs task bodies is out of scope; the
//! dispatcher sees it only as [`ScriptEngine`]. What the contract pins down is
//! the *binding*: which inputs the environment receives and how failure is
//! signaled.
//!
//! ## Binding
//! For each task the engine gets a [`ScriptContext`] carrying:
//! - the task identifier,
//! - the normalized parameter text (possibly empty),
//! - exclusive access to a live store connection,
//! - the byte-output sink,
//! - [`ScriptContext::repair`], the connection-repair callable wired to the
//!   pool.
//!
//! ## Outcome
//! `Ok(Some(msg))` sets an explicit outcome message; `Ok(None)` means success
//! with an empty message. Any `Err` marks the task failed; it is a task-scoped
//! failure, never fatal to the host supplier.

use async_trait::async_trait;

use crate::error::FlumeError;
use crate::pool::{ConnectionPool, PooledConnection, StoreConnection};
use crate::tasks::ResultSink;

/// A loaded script body, resolved by name under the configured scripts root.
#[derive(Debug, Clone)]
pub struct ScriptBody {
    /// The name the task referenced.
    pub name: String,
    /// The script text.
    pub text: String,
}

/// Everything the execution environment sees while running one task.
pub struct ScriptContext<'p> {
    task_id: i64,
    params: String,
    sink: ResultSink,
    pool: &'p ConnectionPool,
    conn: Option<PooledConnection>,
}

impl<'p> ScriptContext<'p> {
    pub(crate) fn new(
        task_id: i64,
        params: String,
        sink: ResultSink,
        pool: &'p ConnectionPool,
        conn: PooledConnection,
    ) -> Self {
        Self {
            task_id,
            params,
            sink,
            pool,
            conn: Some(conn),
        }
    }

    /// The task identifier bound into the environment.
    pub fn task_id(&self) -> i64 {
        self.task_id
    }

    /// The normalized parameter text (empty when the task had none).
    pub fn params(&self) -> &str {
        &self.params
    }

    /// The byte-output destination for the task's binary result.
    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }

    /// The live store connection, if one is currently held.
    ///
    /// `None` only after a failed [`ScriptContext::repair`] left the context
    /// without a connection.
    pub fn connection(&mut self) -> Option<&mut dyn StoreConnection> {
        self.conn.as_mut().map(|c| c.store())
    }

    /// The connection-repair callable.
    ///
    /// Validates the held connection against the pool, transparently
    /// reconnecting if the store broke it mid-script. On failure the context
    /// is left without a connection and the error propagates to the script.
    pub async fn repair(&mut self) -> Result<(), FlumeError> {
        let repaired = match self.conn.take() {
            Some(held) => self.pool.repair(held).await?,
            None => self.pool.acquire().await?,
        };
        self.conn = Some(repaired);
        Ok(())
    }

    /// Hands the connection back to the processor after the run.
    pub(crate) fn into_connection(self) -> Option<PooledConnection> {
        self.conn
    }
}

/// The embedded script-execution environment.
///
/// Implementations run the script text against the bound context and may
/// return an explicit outcome message.
#[async_trait]
pub trait ScriptEngine: Send + Sync + 'static {
    /// Runs one script body to completion.
    async fn run(
        &self,
        body: &ScriptBody,
        ctx: &mut ScriptContext<'_>,
    ) -> Result<Option<String>, FlumeError>;
}
