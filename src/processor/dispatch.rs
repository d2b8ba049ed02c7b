//! # Dispatch hook.
//!
//! [`Dispatch`] is the per-task hook a supplier invokes for every obtained
//! task. The production implementation is
//! [`TaskProcessor`](crate::processor::TaskProcessor); tests and embedders can
//! substitute a closure via [`DispatchFn`].
//!
//! ## Error contract
//! - `Ok(())`: the task was executed and finalized (possibly as failed).
//! - `Err(NonCritical)` / `Err(Runtime)`: the item could not be processed;
//!   the supplier logs and continues.
//! - `Err(Critical)`: infrastructure failure; the supplier applies its
//!   [`RetryPolicy`](crate::policies::RetryPolicy).

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::FlumeError;
use crate::tasks::Task;

/// Shared handle to a dispatch hook.
pub type DispatchRef = Arc<dyn Dispatch>;

/// Processes one task to completion.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    /// Executes the task and records its outcome.
    async fn dispatch(&self, task: Task) -> Result<(), FlumeError>;
}

/// Function-backed dispatch implementation.
///
/// Wraps a closure `FnMut(Task) -> Future`. The closure is guarded by a mutex
/// so `dispatch(&self, …)` can be called through a shared handle; the lock is
/// held only while the future is created, not while it runs.
pub struct DispatchFn<F, Fut>
where
    F: FnMut(Task) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), FlumeError>> + Send + 'static,
{
    func: Mutex<F>,
}

impl<F, Fut> DispatchFn<F, Fut>
where
    F: FnMut(Task) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), FlumeError>> + Send + 'static,
{
    /// Wraps the closure.
    pub fn new(func: F) -> Self {
        Self {
            func: Mutex::new(func),
        }
    }

    /// Wraps the closure and returns it as a shared handle.
    ///
    /// # Example
    /// ```
    /// use taskflume::{DispatchFn, Task};
    ///
    /// let hook = DispatchFn::arc(|task: Task| async move {
    ///     println!("got {}", task.script());
    ///     Ok(())
    /// });
    /// # let _ = hook;
    /// ```
    pub fn arc(func: F) -> DispatchRef {
        Arc::new(Self::new(func))
    }
}

#[async_trait]
impl<F, Fut> Dispatch for DispatchFn<F, Fut>
where
    F: FnMut(Task) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), FlumeError>> + Send + 'static,
{
    async fn dispatch(&self, task: Task) -> Result<(), FlumeError> {
        let fut = {
            let mut f = self
                .func
                .lock()
                .map_err(|_| FlumeError::critical("dispatch closure mutex poisoned"))?;
            (f)(task)
        };
        fut.await
    }
}
