//! Error taxonomy used across the dispatcher.
//!
//! Every failure in the system is one of three kinds, escalating in severity:
//!
//! - [`FlumeError::NonCritical`]: one malformed item (bad payload, unparsable
//!   params). The item is skipped and the supplier continues.
//! - [`FlumeError::Runtime`]: a task-scoped execution failure (missing script,
//!   engine error). The task is finalized as failed; the supplier continues.
//! - [`FlumeError::Critical`]: an infrastructure failure (store unreachable,
//!   pool cannot produce a connection). Propagates to the supplier loop, which
//!   backs off and retries or stops, depending on [`RetryPolicy`].
//!
//! The kind is a discriminant on one enum, not a hierarchy of error types:
//! propagation rules become explicit `match` arms at each call site.
//!
//! [`RetryPolicy`]: crate::policies::RetryPolicy

use thiserror::Error;

/// Severity class of a [`FlumeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Infrastructure failure; the supplier must back off or stop.
    Critical,
    /// One bad item; skip it and continue.
    NonCritical,
    /// Task-scoped failure; the task is finalized as failed.
    Runtime,
}

/// Errors produced by the dispatcher runtime and its collaborators.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FlumeError {
    /// Infrastructure failure: connection pool exhausted or the durable store
    /// is unreachable.
    #[error("critical: {0}")]
    Critical(String),

    /// Malformed input for a single item; the offending item is discarded.
    #[error("skipped: {0}")]
    NonCritical(String),

    /// Task-scoped execution failure; recorded in the task's durable outcome.
    #[error("task failed: {0}")]
    Runtime(String),
}

impl FlumeError {
    /// Builds a [`FlumeError::Critical`] from anything displayable.
    pub fn critical(msg: impl std::fmt::Display) -> Self {
        FlumeError::Critical(msg.to_string())
    }

    /// Builds a [`FlumeError::NonCritical`] from anything displayable.
    pub fn non_critical(msg: impl std::fmt::Display) -> Self {
        FlumeError::NonCritical(msg.to_string())
    }

    /// Builds a [`FlumeError::Runtime`] from anything displayable.
    pub fn runtime(msg: impl std::fmt::Display) -> Self {
        FlumeError::Runtime(msg.to_string())
    }

    /// Returns the severity class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlumeError::Critical(_) => ErrorKind::Critical,
            FlumeError::NonCritical(_) => ErrorKind::NonCritical,
            FlumeError::Runtime(_) => ErrorKind::Runtime,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use taskflume::FlumeError;
    ///
    /// let err = FlumeError::critical("store down");
    /// assert_eq!(err.as_label(), "critical");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FlumeError::Critical(_) => "critical",
            FlumeError::NonCritical(_) => "non_critical",
            FlumeError::Runtime(_) => "runtime",
        }
    }

    /// `true` for [`FlumeError::Critical`].
    pub fn is_critical(&self) -> bool {
        matches!(self, FlumeError::Critical(_))
    }
}
