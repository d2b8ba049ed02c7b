//! # The supplier capability interface.
//!
//! [`TaskSource`] is what every concrete strategy implements: produce the next
//! task, dispatch it, and optionally pace the loop afterwards. There is no
//! base-class template chain; shared behavior (logging, Critical retry)
//! lives in the driver, strategy-specific behavior in the trait impls.
//!
//! ## Cancellation
//! `fetch` receives the loop's [`CancellationToken`] and must observe it at
//! every blocking wait, returning `Ok(None)` promptly once cancellation is
//! requested. Cancellation takes effect *between* tasks: a dispatch that has
//! begun always runs to completion.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FlumeError;
use crate::tasks::{SourceRef, Task};

/// One source of tasks: a long-running, cancellable producer.
#[async_trait]
pub trait TaskSource: Send + Sync + 'static {
    /// Human-readable supplier name, for logs.
    fn name(&self) -> &str;

    /// This supplier's identity, stamped on every task it produces.
    fn tag(&self) -> &SourceRef;

    /// Called once by the driver before the loop starts.
    ///
    /// Strategies with a second generation path (the cron generator) spawn it
    /// here, tied to the loop's token.
    fn start(&self, token: &CancellationToken) {
        let _ = token;
    }

    /// Produces the next task.
    ///
    /// - `Ok(Some(task))`: a task, stamped with [`TaskSource::tag`].
    /// - `Ok(None)`: cancellation was observed while waiting; the loop exits.
    /// - `Err(NonCritical)`: one malformed item; the loop logs and continues.
    /// - `Err(Critical)`: the source is unreachable; the retry policy applies.
    async fn fetch(&self, token: &CancellationToken) -> Result<Option<Task>, FlumeError>;

    /// Processes one obtained task.
    ///
    /// The production binding forwards to the processor, directly or through
    /// a bounded worker pool.
    async fn dispatch(&self, task: Task) -> Result<(), FlumeError>;

    /// Outcome-dependent pause after a dispatch (loop strategies only).
    ///
    /// Must return promptly once `token` is cancelled.
    async fn pace(&self, outcome: &Result<(), FlumeError>, token: &CancellationToken) {
        let _ = (outcome, token);
    }

    /// Called once after the loop exits; strategies with in-flight workers
    /// wait for them here.
    async fn drain(&self) {}
}
