//! Task model: the unit of work flowing from suppliers to the processor.
//!
//! - [`Task`]: a script reference, parameters, a result sink, and a
//!   back-reference to the supplier that produced it.
//! - [`Params`]: structured-or-plain task parameters, exactly one form.
//! - [`codec`]: the broker wire format (`{"script":…,"params":…}`).

pub mod codec;
mod params;
mod task;

pub use params::Params;
pub use task::{ResultSink, SourceRef, SourceTag, Task, TaskStatus, EPHEMERAL_ID};
