//! # Broker supplier.
//!
//! Blocks on an external broker list, decodes each payload, and fans the
//! resulting tasks out across a bounded worker pool:
//!
//! ```text
//! broker.pop() ──► decode ──► spawn worker ──► acquire slot ──► dispatch
//!       │             │                             │
//!       │             │                             └─ at most `max_workers` running
//!       │             └─ malformed payload → NonCritical, item skipped
//!       └─ broker unreachable → Critical, retry policy applies
//! ```
//!
//! ## Rules
//! - Acceptance is unbounded: `dispatch` hands the task to a worker at once
//!   and returns, so busy workers never stall the pop loop. The semaphore
//!   bounds how many workers *run*, and its FIFO wait queue keeps
//!   execution-start order equal to submission order.
//! - Once a payload is decoded the task always reaches a worker, so
//!   cancellation never drops accepted work.
//! - `drain` waits for every spawned worker, queued ones included, before the
//!   supplier reports stopped.
//! - A Critical failure inside a detached worker cannot reach the supplier's
//!   retry policy; it is logged at error level and the worker exits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::select;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::brokers::Broker;
use crate::error::FlumeError;
use crate::processor::DispatchRef;
use crate::suppliers::TaskSource;
use crate::tasks::{codec, SourceRef, SourceTag, Task, EPHEMERAL_ID};

/// Supplies tasks popped from one broker queue, dispatching them on a
/// bounded worker pool.
pub struct BrokerSupplier<B: Broker> {
    tag: SourceRef,
    broker: Arc<B>,
    queue: String,
    dispatcher: DispatchRef,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl<B: Broker> BrokerSupplier<B> {
    /// Creates a broker supplier reading `queue` with at most `max_workers`
    /// tasks in flight.
    pub fn new(
        name: impl Into<String>,
        broker: Arc<B>,
        queue: impl Into<String>,
        dispatcher: DispatchRef,
        max_workers: usize,
    ) -> Self {
        Self {
            tag: SourceTag::new(name),
            broker,
            queue: queue.into(),
            dispatcher,
            workers: Arc::new(Semaphore::new(max_workers.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// The queue this supplier reads.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Decodes one raw payload into a task stamped with this supplier's
    /// identity.
    fn decode(&self, payload: &str) -> Result<Task, FlumeError> {
        let (script, params) = codec::decode(payload)?;
        Ok(Task::from_source(&self.tag, EPHEMERAL_ID, script, params))
    }
}

#[async_trait]
impl<B: Broker> TaskSource for BrokerSupplier<B> {
    fn name(&self) -> &str {
        self.tag.name()
    }

    fn tag(&self) -> &SourceRef {
        &self.tag
    }

    async fn fetch(&self, token: &CancellationToken) -> Result<Option<Task>, FlumeError> {
        let payload = select! {
            popped = self.broker.pop(&self.queue) => popped?,
            _ = token.cancelled() => return Ok(None),
        };
        debug!(source = self.tag.name(), queue = %self.queue, "popped payload");
        self.decode(&payload).map(Some)
    }

    async fn dispatch(&self, task: Task) -> Result<(), FlumeError> {
        // The payload is already consumed from the broker, so the task is
        // handed to a worker immediately and the slot wait happens inside it.
        let workers = Arc::clone(&self.workers);
        let dispatcher = Arc::clone(&self.dispatcher);
        let source = self.tag.name().to_owned();
        self.tracker.spawn(async move {
            let _permit = match workers.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(source = %source, "worker pool is closed, dropping task");
                    return;
                }
            };
            match dispatcher.dispatch(task).await {
                Ok(()) => {}
                Err(e) if e.is_critical() => {
                    error!(source = %source, error = %e, "critical failure in worker");
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "task processing failed");
                }
            }
        });
        Ok(())
    }

    async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brokers::MemoryBroker;
    use crate::processor::DispatchFn;
    use crate::tasks::Params;
    use std::time::Duration;

    fn supplier(max_workers: usize) -> BrokerSupplier<MemoryBroker> {
        BrokerSupplier::new(
            "broker",
            Arc::new(MemoryBroker::new()),
            "tasks",
            DispatchFn::arc(|_task: Task| async move { Ok(()) }),
            max_workers,
        )
    }

    #[tokio::test]
    async fn test_fetch_decodes_pushed_payload() {
        let s = supplier(2);
        s.broker
            .push("tasks", r#"{"script":"ss","params":"pp"}"#);

        let token = CancellationToken::new();
        let task = s.fetch(&token).await.unwrap().unwrap();
        assert_eq!(task.script(), "ss");
        assert_eq!(task.params().as_text(), Some("pp"));
        assert!(task.same_source(s.tag()));
        assert!(task.is_ephemeral());
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_payload_as_non_critical() {
        let s = supplier(2);
        s.broker.push("tasks", r#"{"s{"#);

        let token = CancellationToken::new();
        let err = s.fetch(&token).await.unwrap_err();
        assert!(!err.is_critical());
    }

    #[tokio::test]
    async fn test_fetch_unblocks_on_cancellation() {
        let s = supplier(2);
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let fetched = tokio::time::timeout(Duration::from_secs(5), s.fetch(&token))
            .await
            .expect("fetch must observe cancellation");
        assert!(fetched.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_workers() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let s = BrokerSupplier::new(
            "broker",
            Arc::new(MemoryBroker::new()),
            "tasks",
            DispatchFn::arc(move |_task: Task| {
                let counter = Arc::clone(&counter);
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            4,
        );

        for _ in 0..4 {
            s.dispatch(Task::new(EPHEMERAL_ID, "ss", Params::None))
                .await
                .unwrap();
        }
        s.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_running_workers_never_exceed_max_workers() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let peak = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicUsize::new(0));
        let (peak_c, live_c) = (Arc::clone(&peak), Arc::clone(&live));
        let s = BrokerSupplier::new(
            "broker",
            Arc::new(MemoryBroker::new()),
            "tasks",
            DispatchFn::arc(move |_task: Task| {
                let (peak, live) = (Arc::clone(&peak_c), Arc::clone(&live_c));
                async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
            2,
        );

        for _ in 0..6 {
            s.dispatch(Task::new(EPHEMERAL_ID, "ss", Params::None))
                .await
                .unwrap();
        }
        s.drain().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_busy_workers_do_not_stall_acceptance() {
        let broker = Arc::new(MemoryBroker::new());
        let s = BrokerSupplier::new(
            "broker",
            Arc::clone(&broker),
            "tasks",
            DispatchFn::arc(|_task: Task| async move {
                std::future::pending::<()>().await;
                Ok(())
            }),
            1,
        );

        // Occupy the single slot with a task that never completes.
        s.dispatch(Task::new(EPHEMERAL_ID, "ss", Params::None))
            .await
            .unwrap();

        for _ in 0..3 {
            broker.push("tasks", r#"{"script":"ss"}"#);
        }

        // Every payload must still be popped and handed to a worker promptly.
        let token = CancellationToken::new();
        for _ in 0..3 {
            let task = tokio::time::timeout(Duration::from_secs(1), s.fetch(&token))
                .await
                .expect("fetch must not wait for a free worker")
                .unwrap()
                .unwrap();
            tokio::time::timeout(Duration::from_secs(1), s.dispatch(task))
                .await
                .expect("dispatch must accept work while all workers are busy")
                .unwrap();
        }
        assert!(broker.is_empty("tasks"));
    }
}
