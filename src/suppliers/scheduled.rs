//! # Scheduled supplier.
//!
//! Two generation paths feed one unbounded FIFO queue:
//!
//! ```text
//! cron generator ──► enqueue(default script/params) ──┐
//!                                                     ├──► queue ──► fetch()
//! add(task)      ──► enqueue(ad-hoc task)  ───────────┘
//! ```
//!
//! The consumer dequeues continuously (it is *not* gated by the cron tick),
//! so ad-hoc additions are processed with near-immediate latency regardless
//! of the cron period.
//!
//! ## Rules
//! - The queue is strictly FIFO across both paths.
//! - The cron generator wakes at the next matching minute, enqueues one fresh
//!   task, and sleeps again; cancellation interrupts the sleep.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::{mpsc, Mutex};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::FlumeError;
use crate::processor::DispatchRef;
use crate::schedule::CronSpec;
use crate::suppliers::TaskSource;
use crate::tasks::{Params, SourceRef, SourceTag, Task, EPHEMERAL_ID};

/// Supplies tasks from a cron schedule merged with an ad-hoc queue.
pub struct ScheduledSupplier {
    tag: SourceRef,
    dispatcher: DispatchRef,
    schedule: CronSpec,
    script: String,
    params: Params,
    tx: mpsc::UnboundedSender<Task>,
    rx: Mutex<mpsc::UnboundedReceiver<Task>>,
}

impl ScheduledSupplier {
    /// Creates a scheduled supplier.
    ///
    /// `script`/`params` are the defaults used for cron-generated tasks.
    pub fn new(
        name: impl Into<String>,
        dispatcher: DispatchRef,
        schedule: CronSpec,
        script: impl Into<String>,
        params: Params,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            tag: SourceTag::new(name),
            dispatcher,
            schedule,
            script: script.into(),
            params,
            tx,
            rx: Mutex::new(rx),
        })
    }

    /// Enqueues an ad-hoc task immediately, bypassing the schedule.
    ///
    /// Used by external callers (the REST adapter) to trigger work on demand.
    /// Tasks without a source are stamped with this supplier's identity.
    pub fn add(&self, task: Task) -> Result<(), FlumeError> {
        let task = if task.source().is_some() {
            task
        } else {
            task.with_source(&self.tag)
        };
        self.tx
            .send(task)
            .map_err(|_| FlumeError::non_critical("scheduled queue is closed"))
    }

    /// Builds an ad-hoc task already stamped with this supplier's identity.
    pub fn task(&self, id: i64, script: impl Into<String>, params: Params) -> Task {
        Task::from_source(&self.tag, id, script, params)
    }
}

#[async_trait]
impl TaskSource for ScheduledSupplier {
    fn name(&self) -> &str {
        self.tag.name()
    }

    fn tag(&self) -> &SourceRef {
        &self.tag
    }

    /// Spawns the cron generator tied to the loop's token.
    fn start(&self, token: &CancellationToken) {
        let schedule = self.schedule.clone();
        let tx = self.tx.clone();
        let tag = Arc::clone(&self.tag);
        let script = self.script.clone();
        let params = self.params.clone();
        let token = token.clone();

        tokio::spawn(async move {
            loop {
                let now = Local::now();
                let Some(next) = schedule.next_after(&now) else {
                    warn!(source = tag.name(), "cron schedule never fires, generator exiting");
                    return;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                let sleep = time::sleep(wait);
                tokio::pin!(sleep);
                select! {
                    _ = &mut sleep => {}
                    _ = token.cancelled() => return,
                }

                debug!(source = tag.name(), script = %script, "cron tick");
                let task =
                    Task::from_source(&tag, EPHEMERAL_ID, script.clone(), params.clone());
                if tx.send(task).is_err() {
                    return;
                }
            }
        });
    }

    async fn fetch(&self, token: &CancellationToken) -> Result<Option<Task>, FlumeError> {
        let mut rx = self.rx.lock().await;
        select! {
            task = rx.recv() => Ok(task),
            _ = token.cancelled() => Ok(None),
        }
    }

    async fn dispatch(&self, task: Task) -> Result<(), FlumeError> {
        self.dispatcher.dispatch(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::DispatchFn;

    fn supplier() -> Arc<ScheduledSupplier> {
        ScheduledSupplier::new(
            "sched",
            DispatchFn::arc(|_task: Task| async move { Ok(()) }),
            CronSpec::parse("* * * * *").unwrap(),
            "default.py",
            Params::None,
        )
    }

    #[tokio::test]
    async fn test_added_tasks_come_out_fifo() {
        let s = supplier();
        for i in 0..5 {
            s.add(s.task(EPHEMERAL_ID, "ss", Params::Text(i.to_string())))
                .unwrap();
        }

        let token = CancellationToken::new();
        for i in 0..5 {
            let task = s.fetch(&token).await.unwrap().unwrap();
            assert_eq!(task.params().as_text(), Some(i.to_string().as_str()));
        }
    }

    #[tokio::test]
    async fn test_add_stamps_source_when_missing() {
        let s = supplier();
        s.add(Task::new(EPHEMERAL_ID, "ss", Params::None)).unwrap();
        let token = CancellationToken::new();
        let task = s.fetch(&token).await.unwrap().unwrap();
        assert!(task.same_source(s.tag()));
    }

    #[tokio::test]
    async fn test_fetch_observes_cancellation() {
        let s = supplier();
        let token = CancellationToken::new();
        token.cancel();
        assert!(s.fetch(&token).await.unwrap().is_none());
    }
}
