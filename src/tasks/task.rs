//! # The task entity.
//!
//! A [`Task`] is immutable once created except for its result sink, which the
//! processor (via the engine) fills during execution. Tasks are not reused:
//! each one is created by a supplier at dispatch time and discarded after
//! finalization.
//!
//! ## Rules
//! - `id` is stable for the life of the task; [`EPHEMERAL_ID`] marks tasks
//!   with no backing durable row (ad-hoc tasks), for which finalization is
//!   skipped.
//! - `source` is stamped by the supplier that created the task and never
//!   changes afterward. Identity is `Arc` pointer equality, so "same source"
//!   means "the same supplier instance", not "a supplier with the same name".

use std::sync::{Arc, Mutex};

use crate::tasks::Params;

/// Sentinel id for tasks with no backing durable record.
pub const EPHEMERAL_ID: i64 = 0;

/// Durable status codes for a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum TaskStatus {
    /// Queued, not yet picked up.
    Pending = 0,
    /// Picked up by a processor.
    InProgress = 1,
    /// Finished without error.
    Success = 2,
    /// Finished with a recorded failure.
    Failure = 3,
}

impl TaskStatus {
    /// The small-integer encoding stored in the durable record.
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Identity of a task supplier, shared by every task it produces.
///
/// Held behind an [`Arc`]; two tags are the same source only if they are the
/// same allocation.
#[derive(Debug)]
pub struct SourceTag {
    name: String,
}

impl SourceTag {
    /// Creates a tag carrying a human-readable supplier name.
    pub fn new(name: impl Into<String>) -> SourceRef {
        Arc::new(SourceTag { name: name.into() })
    }

    /// The supplier name, for logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shared handle to a supplier identity.
pub type SourceRef = Arc<SourceTag>;

/// Byte-output destination a script body may write a binary result into.
///
/// Cheap to clone; all clones share one buffer. The mutex is held only for
/// short copies, never across an await point.
#[derive(Debug, Clone, Default)]
pub struct ResultSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl ResultSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes to the captured result.
    pub fn write(&self, bytes: &[u8]) {
        if let Ok(mut buf) = self.buf.lock() {
            buf.extend_from_slice(bytes);
        }
    }

    /// Number of bytes captured so far; 0 means "no result".
    pub fn len(&self) -> usize {
        self.buf.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// `true` if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the captured bytes, leaving the sink empty.
    pub fn take(&self) -> Vec<u8> {
        self.buf.lock().map(|mut b| std::mem::take(&mut *b)).unwrap_or_default()
    }
}

/// One unit of work: a script reference, parameters, and an outcome slot.
#[derive(Debug, Clone)]
pub struct Task {
    id: i64,
    script: String,
    params: Params,
    sink: ResultSink,
    source: Option<SourceRef>,
}

impl Task {
    /// Creates a task with no source attached yet.
    ///
    /// Suppliers stamp their identity with [`Task::with_source`] before the
    /// task leaves them.
    pub fn new(id: i64, script: impl Into<String>, params: Params) -> Self {
        Self {
            id,
            script: script.into(),
            params,
            sink: ResultSink::new(),
            source: None,
        }
    }

    /// Creates a task already stamped with its producing supplier.
    pub fn from_source(
        source: &SourceRef,
        id: i64,
        script: impl Into<String>,
        params: Params,
    ) -> Self {
        Self::new(id, script, params).with_source(source)
    }

    /// Stamps the producing supplier. Set once, before dispatch.
    pub fn with_source(mut self, source: &SourceRef) -> Self {
        self.source = Some(Arc::clone(source));
        self
    }

    /// Identifier of the durable record, or [`EPHEMERAL_ID`].
    pub fn id(&self) -> i64 {
        self.id
    }

    /// `true` if this task has no backing durable row.
    pub fn is_ephemeral(&self) -> bool {
        self.id == EPHEMERAL_ID
    }

    /// Name of the script body to execute.
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Task parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The byte-output destination for this task.
    pub fn sink(&self) -> &ResultSink {
        &self.sink
    }

    /// The supplier that produced this task, if any.
    pub fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    /// `true` if this task was produced by the given supplier instance.
    pub fn same_source(&self, tag: &SourceRef) -> bool {
        self.source.as_ref().is_some_and(|s| Arc::ptr_eq(s, tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_identity_is_pointer_equality() {
        let a = SourceTag::new("loop");
        let b = SourceTag::new("loop");
        let task = Task::from_source(&a, 1, "foo", Params::None);
        assert!(task.same_source(&a));
        assert!(!task.same_source(&b));
    }

    #[test]
    fn test_sink_round_trip() {
        let task = Task::new(EPHEMERAL_ID, "foo", Params::None);
        assert!(task.sink().is_empty());
        task.sink().write(b"abc");
        task.sink().write(b"def");
        assert_eq!(task.sink().len(), 6);
        assert_eq!(task.sink().take(), b"abcdef");
        assert!(task.sink().is_empty());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TaskStatus::Pending.code(), 0);
        assert_eq!(TaskStatus::InProgress.code(), 1);
        assert_eq!(TaskStatus::Success.code(), 2);
        assert_eq!(TaskStatus::Failure.code(), 3);
    }

    #[test]
    fn test_ephemeral_sentinel() {
        assert!(Task::new(0, "s", Params::None).is_ephemeral());
        assert!(!Task::new(17, "s", Params::None).is_ephemeral());
    }
}
