//! # The task processor.
//!
//! Executes exactly one task per call and records its outcome. Errors are
//! reported through finalization, not to the caller; the only thing that
//! escapes [`TaskProcessor::execute`] is a Critical failure to obtain any
//! connection at all.
//!
//! ## Flow
//! ```text
//! execute(task)
//!   ├─► pool.acquire()                 (Critical escapes to the supplier)
//!   ├─► scripts.load(task.script)      (missing/unreadable → Runtime)
//!   ├─► params.normalize()             (bad document → Runtime)
//!   ├─► engine.run(body, ctx)          (engine error → Runtime)
//!   └─► finish():
//!         ├─► repair/re-acquire a healthy connection
//!         ├─► finalize durable record  (skipped for ephemeral tasks)
//!         │     STATUS  = 2 (success) / 3 (failure)
//!         │     RESULT  = sink bytes, NULL if empty
//!         │     ERRORTEXT = failure message, NULL on success
//!         └─► pool.release()           (always, even if finalize failed)
//! ```
//!
//! ## Rules
//! - Finalization is always attempted, even when the script failed; the
//!   connection used for execution may itself be broken by then, so a repair
//!   runs first.
//! - A finalization failure is logged at `error!` and swallowed; the in-memory
//!   task is discarded and the connection still goes back to the pool.
//! - Ephemeral tasks (id 0) have no durable row; finalization is skipped and
//!   no replacement connection is acquired on their behalf.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::engine::{ScriptContext, ScriptEngine};
use crate::error::FlumeError;
use crate::pool::{ConnectionPool, PooledConnection};
use crate::processor::{Dispatch, ScriptRepo};
use crate::tasks::{Task, TaskStatus};

/// Executes tasks against pooled connections and finalizes their outcomes.
pub struct TaskProcessor<E: ScriptEngine> {
    pool: Arc<ConnectionPool>,
    engine: Arc<E>,
    scripts: ScriptRepo,
}

impl<E: ScriptEngine> TaskProcessor<E> {
    /// Creates a processor over the given pool, engine, and scripts root.
    pub fn new(pool: Arc<ConnectionPool>, engine: Arc<E>, scripts: ScriptRepo) -> Self {
        Self {
            pool,
            engine,
            scripts,
        }
    }

    /// Executes one task to completion and records its outcome.
    ///
    /// Only [`FlumeError::Critical`] (no connection could be obtained at all)
    /// propagates; every other failure ends as a finalized task outcome.
    pub async fn execute(&self, task: Task) -> Result<(), FlumeError> {
        let conn = self.pool.acquire().await?;
        let (outcome, conn) = self.run_body(&task, conn).await;
        self.finish(&task, outcome, conn).await;
        Ok(())
    }

    /// Loads the script, normalizes params, and runs the engine.
    ///
    /// Returns the outcome message (or the Runtime failure) together with
    /// whatever connection survived the run.
    async fn run_body(
        &self,
        task: &Task,
        conn: PooledConnection,
    ) -> (Result<String, FlumeError>, Option<PooledConnection>) {
        let body = match self.scripts.load(task.script()).await {
            Ok(body) => body,
            Err(e) => return (Err(e), Some(conn)),
        };

        let params = match task.params().normalize() {
            Ok(params) => params,
            Err(e) => return (Err(e), Some(conn)),
        };

        let mut ctx = ScriptContext::new(
            task.id(),
            params,
            task.sink().clone(),
            &self.pool,
            conn,
        );
        let result = self.engine.run(&body, &mut ctx).await;
        let conn = ctx.into_connection();

        match result {
            Ok(message) => (Ok(message.unwrap_or_default()), conn),
            // Whatever the engine raised, it is a task-scoped failure here.
            Err(e @ FlumeError::Runtime(_)) => (Err(e), conn),
            Err(e) => (Err(FlumeError::runtime(e.to_string())), conn),
        }
    }

    /// Finalizes the durable record and releases the connection.
    ///
    /// Never fails: durable-store errors during finalization are logged above
    /// normal task failures and swallowed.
    async fn finish(
        &self,
        task: &Task,
        outcome: Result<String, FlumeError>,
        conn: Option<PooledConnection>,
    ) {
        let (status, message) = match &outcome {
            Ok(message) => (TaskStatus::Success, message.clone()),
            Err(e) => (TaskStatus::Failure, e.to_string()),
        };

        // The execution connection may be broken; get a healthy one. An
        // ephemeral task has no row to finalize, so no connection is
        // re-acquired on its behalf.
        let healthy = match conn {
            Some(held) => Some(self.pool.repair(held).await),
            None if task.is_ephemeral() => None,
            None => Some(self.pool.acquire().await),
        };

        match healthy {
            Some(Ok(mut conn)) => {
                if task.is_ephemeral() {
                    debug!(script = task.script(), "ephemeral task, skipping finalization");
                } else {
                    let bytes = task.sink().take();
                    let result = (!bytes.is_empty()).then_some(bytes.as_slice());
                    let error_text = outcome.as_ref().err().map(|_| message.as_str());
                    if let Err(e) = conn
                        .store()
                        .finalize(task.id(), status, result, error_text)
                        .await
                    {
                        error!(
                            task = task.id(),
                            script = task.script(),
                            error = %e,
                            "could not finalize task"
                        );
                    }
                }
                self.pool.release(conn).await;
            }
            Some(Err(e)) if task.is_ephemeral() => {
                debug!(
                    script = task.script(),
                    error = %e,
                    "discarding broken connection of ephemeral task"
                );
            }
            Some(Err(e)) => {
                error!(
                    task = task.id(),
                    script = task.script(),
                    error = %e,
                    "could not finalize task: no connection"
                );
            }
            None => {
                debug!(script = task.script(), "ephemeral task, skipping finalization");
            }
        }

        if let Err(e) = &outcome {
            warn!(
                task = task.id(),
                script = task.script(),
                message = %e,
                "task failed"
            );
        }
    }
}

#[async_trait]
impl<E: ScriptEngine> Dispatch for TaskProcessor<E> {
    async fn dispatch(&self, task: Task) -> Result<(), FlumeError> {
        self.execute(task).await
    }
}
