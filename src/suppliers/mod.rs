//! Task suppliers: long-running, cancellable producers of tasks.
//!
//! A supplier is one source of work. Each runs on its own spawned activity,
//! looping obtain → dispatch → pace until cancelled. The strategies differ
//! only in where tasks come from:
//!
//! - [`LoopSupplier`] regenerates one fixed task with outcome-dependent delay;
//! - [`ScheduledSupplier`] merges a cron generator with an ad-hoc queue;
//! - [`BrokerSupplier`] blocks on an external broker list and fans decoded
//!   tasks out across a bounded worker pool.
//!
//! The shared loop lives in [`run_supplier`]; Critical-failure handling is a
//! [`RetryPolicy`](crate::policies::RetryPolicy) the driver applies uniformly.

mod broker;
mod driver;
mod loop_supplier;
mod scheduled;
mod source;

pub use broker::BrokerSupplier;
pub use driver::run_supplier;
pub use loop_supplier::LoopSupplier;
pub use scheduled::ScheduledSupplier;
pub use source::TaskSource;
