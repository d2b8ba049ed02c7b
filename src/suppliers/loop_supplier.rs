//! # Loop supplier.
//!
//! Regenerates one fixed `(script, params)` pair as a fresh task on every
//! iteration: distinct task instances, same content. After a successful
//! dispatch the loop sleeps `wait_on_success`; after a non-Critical failure,
//! `wait_on_failure` (both default 1000 ms).
//!
//! ## Rules
//! - Every generated task is ephemeral (id 0): there is no backing queue row.
//! - Mutating the script or params takes effect on the *next* generated task;
//!   tasks already returned are unaffected.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::FlumeError;
use crate::processor::DispatchRef;
use crate::suppliers::TaskSource;
use crate::tasks::{Params, SourceRef, SourceTag, Task, EPHEMERAL_ID};

/// Supplies the same task content in an endless paced loop.
pub struct LoopSupplier {
    tag: SourceRef,
    dispatcher: DispatchRef,
    script: RwLock<String>,
    params: RwLock<Params>,
    wait_on_success: Duration,
    wait_on_failure: Duration,
}

impl LoopSupplier {
    /// Creates a loop supplier dispatching through `dispatcher`.
    pub fn new(name: impl Into<String>, dispatcher: DispatchRef) -> Self {
        Self {
            tag: SourceTag::new(name),
            dispatcher,
            script: RwLock::new(String::new()),
            params: RwLock::new(Params::None),
            wait_on_success: Duration::from_millis(1000),
            wait_on_failure: Duration::from_millis(1000),
        }
    }

    /// Sets the pause after a successful dispatch.
    pub fn with_wait_on_success(mut self, wait: Duration) -> Self {
        self.wait_on_success = wait;
        self
    }

    /// Sets the pause after a failed dispatch.
    pub fn with_wait_on_failure(mut self, wait: Duration) -> Self {
        self.wait_on_failure = wait;
        self
    }

    /// The configured success pause.
    pub fn wait_on_success(&self) -> Duration {
        self.wait_on_success
    }

    /// The configured failure pause.
    pub fn wait_on_failure(&self) -> Duration {
        self.wait_on_failure
    }

    /// Sets the script generated tasks will reference, starting with the next
    /// one.
    pub fn set_script(&self, script: impl Into<String>) {
        if let Ok(mut s) = self.script.write() {
            *s = script.into();
        }
    }

    /// Sets the params generated tasks will carry, starting with the next one.
    pub fn set_params(&self, params: impl Into<Params>) {
        if let Ok(mut p) = self.params.write() {
            *p = params.into();
        }
    }

    /// Builds a fresh task from the current script/params.
    pub fn generate(&self) -> Task {
        let script = self.script.read().map(|s| s.clone()).unwrap_or_default();
        let params = self.params.read().map(|p| p.clone()).unwrap_or_default();
        Task::from_source(&self.tag, EPHEMERAL_ID, script, params)
    }
}

#[async_trait]
impl TaskSource for LoopSupplier {
    fn name(&self) -> &str {
        self.tag.name()
    }

    fn tag(&self) -> &SourceRef {
        &self.tag
    }

    async fn fetch(&self, _token: &CancellationToken) -> Result<Option<Task>, FlumeError> {
        Ok(Some(self.generate()))
    }

    async fn dispatch(&self, task: Task) -> Result<(), FlumeError> {
        self.dispatcher.dispatch(task).await
    }

    async fn pace(&self, outcome: &Result<(), FlumeError>, token: &CancellationToken) {
        let wait = match outcome {
            Ok(()) => self.wait_on_success,
            Err(_) => self.wait_on_failure,
        };
        let sleep = time::sleep(wait);
        tokio::pin!(sleep);
        select! {
            _ = &mut sleep => {}
            _ = token.cancelled() => {}
        }
    }
}
