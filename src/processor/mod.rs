//! Task processing: run one task body, record its outcome durably.
//!
//! - [`TaskProcessor`]: the executor: acquires a pooled connection, loads the
//!   script, runs the engine, and finalizes the task's durable record.
//! - [`Dispatch`]: the hook suppliers call once per obtained task; the
//!   production binding is `TaskProcessor::execute`, tests substitute
//!   [`DispatchFn`] closures.
//! - [`ScriptRepo`]: resolves script names to bodies on disk.

mod dispatch;
mod processor;
mod scripts;

pub use dispatch::{Dispatch, DispatchFn, DispatchRef};
pub use processor::TaskProcessor;
pub use scripts::ScriptRepo;
