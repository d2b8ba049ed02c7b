//! In-process broker backed by plain `VecDeque` queues.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::brokers::Broker;
use crate::error::FlumeError;

/// An in-memory broker: named FIFO queues plus a wakeup for blocked poppers.
#[derive(Default)]
pub struct MemoryBroker {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    notify: Notify,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `payload` to `queue`, waking any blocked [`Broker::pop`].
    pub fn push(&self, queue: impl Into<String>, payload: impl Into<String>) {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues
            .entry(queue.into())
            .or_default()
            .push_back(payload.into());
        drop(queues);
        self.notify.notify_waiters();
    }

    /// Number of items currently waiting on `queue`.
    pub fn len(&self, queue: &str) -> usize {
        let queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.get(queue).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }

    fn try_pop(&self, queue: &str) -> Option<String> {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.get_mut(queue).and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn pop(&self, queue: &str) -> Result<String, FlumeError> {
        loop {
            // Register before checking, so a push between the check and the
            // await still wakes us.
            let notified = self.notify.notified();
            if let Some(item) = self.try_pop(queue) {
                return Ok(item);
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pop_returns_pushed_items_fifo() {
        let broker = MemoryBroker::new();
        broker.push("q", "one");
        broker.push("q", "two");

        assert_eq!(broker.pop("q").await.unwrap(), "one");
        assert_eq!(broker.pop("q").await.unwrap(), "two");
        assert!(broker.is_empty("q"));
    }

    #[tokio::test]
    async fn test_pop_blocks_until_push() {
        let broker = Arc::new(MemoryBroker::new());
        let popper = Arc::clone(&broker);
        let handle = tokio::spawn(async move { popper.pop("q").await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.push("q", "late");

        let item = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("pop must wake on push")
            .unwrap()
            .unwrap();
        assert_eq!(item, "late");
    }

    #[tokio::test]
    async fn test_queues_are_independent() {
        let broker = MemoryBroker::new();
        broker.push("a", "for-a");
        broker.push("b", "for-b");

        assert_eq!(broker.pop("b").await.unwrap(), "for-b");
        assert_eq!(broker.len("a"), 1);
    }
}
