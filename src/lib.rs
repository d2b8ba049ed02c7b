//! # taskflume
//!
//! **Taskflume** is a long-running task dispatcher library for Rust.
//!
//! It pulls tasks from pluggable sources (a paced loop, a cron schedule with
//! an ad-hoc queue, an external message broker), runs each task's script
//! through an embedded execution environment, and records the durable outcome
//! through a bounded, self-repairing connection pool. The crate is a building
//! block: the script engine and the store behind the pool are traits the
//! embedder provides.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────┐   ┌────────────────────┐   ┌──────────────────┐
//!  │ LoopSupplier │   │ ScheduledSupplier  │   │  BrokerSupplier  │
//!  │ (fixed task, │   │ (cron + ad-hoc     │   │ (pop + decode +  │
//!  │  paced)      │   │  queue)            │   │  worker fan-out) │
//!  └──────┬───────┘   └─────────┬──────────┘   └────────┬─────────┘
//!         │ run_supplier        │ run_supplier          │ run_supplier
//!         ▼                     ▼                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher (host)                                                │
//! │  - one activity per supplier, child CancellationTokens            │
//! │  - RetryPolicy applied uniformly on Critical failures             │
//! │  - OS-signal shutdown, grace-bounded join                         │
//! └────────────────────────────────┬──────────────────────────────────┘
//!                                  │ Dispatch::dispatch(task)
//!                                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskProcessor                                                    │
//! │  - acquire pooled connection                                      │
//! │  - load script body (ScriptRepo)                                  │
//! │  - normalize params, bind ScriptContext (with repair callable)    │
//! │  - ScriptEngine::run(body, ctx)                                   │
//! │  - finalize durable outcome, always release the connection        │
//! └───────────┬────────────────────────────────────┬──────────────────┘
//!             ▼                                    ▼
//!      ┌─────────────┐                     ┌────────────────┐
//!      │ ScriptEngine│ (embedder trait)    │ ConnectionPool │
//!      └─────────────┘                     │  (bounded,     │
//!                                          │   repairable)  │
//!                                          └───────┬────────┘
//!                                                  ▼
//!                                          Connector / StoreConnection
//!                                             (embedder traits)
//! ```
//!
//! ### Failure model
//! Every failure is one of three kinds ([`FlumeError`]):
//!
//! ```text
//! NonCritical ─► one bad item; log, skip, continue
//! Runtime     ─► task-scoped; finalize the task as failed, continue
//! Critical    ─► infrastructure; supplier backs off per RetryPolicy
//! ```
//!
//! ## Features
//! | Area           | Description                                                  | Key types / traits                            |
//! |----------------|--------------------------------------------------------------|-----------------------------------------------|
//! | **Suppliers**  | Long-running, cancellable task sources.                      | [`TaskSource`], [`LoopSupplier`], [`ScheduledSupplier`], [`BrokerSupplier`] |
//! | **Processing** | Script loading, execution binding, durable finalization.     | [`TaskProcessor`], [`ScriptEngine`], [`ScriptContext`] |
//! | **Pooling**    | Bounded store connections with validate-and-reconnect.       | [`ConnectionPool`], [`Connector`], [`StoreConnection`] |
//! | **Scheduling** | Five-field cron expressions.                                 | [`CronSpec`]                                  |
//! | **Brokers**    | Blocking string queues feeding the broker supplier.          | [`Broker`], [`MemoryBroker`]                  |
//! | **Hosting**    | Supplier lifecycle, signals, graceful shutdown.              | [`Dispatcher`], [`Config`], [`RetryPolicy`]   |
//! | **Errors**     | Three-kind severity taxonomy.                                | [`FlumeError`], [`ErrorKind`]                 |
//!
//! ## Optional features
//! - `redis`: exports `RedisBroker`, Redis lists via `BLPOP`.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskflume::{BrokerSupplier, Config, DispatchFn, Dispatcher, MemoryBroker, Task};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), taskflume::FlumeError> {
//!     let broker = Arc::new(MemoryBroker::new());
//!     broker.push("tasks", r#"{"script":"report.py","params":"today"}"#);
//!
//!     // The production dispatch target is a TaskProcessor; any Dispatch works.
//!     let dispatch = DispatchFn::arc(|task: Task| async move {
//!         println!("running {}", task.script());
//!         Ok(())
//!     });
//!
//!     let supplier = BrokerSupplier::new("main", broker, "tasks", dispatch, 4);
//!
//!     let mut host = Dispatcher::new(Config::default());
//!     host.register(Arc::new(supplier));
//!     host.run().await
//! }
//! ```

mod brokers;
mod config;
mod core;
mod engine;
mod error;
mod policies;
mod pool;
mod processor;
mod schedule;
mod suppliers;
mod tasks;

// ---- Public re-exports ----

pub use brokers::{Broker, MemoryBroker};
pub use config::Config;
pub use core::Dispatcher;
pub use engine::{ScriptBody, ScriptContext, ScriptEngine};
pub use error::{ErrorKind, FlumeError};
pub use policies::RetryPolicy;
pub use pool::{ConnectionPool, Connector, PooledConnection, StoreConnection};
pub use processor::{Dispatch, DispatchFn, DispatchRef, ScriptRepo, TaskProcessor};
pub use schedule::CronSpec;
pub use suppliers::{
    run_supplier, BrokerSupplier, LoopSupplier, ScheduledSupplier, TaskSource,
};
pub use tasks::{codec, Params, ResultSink, SourceRef, SourceTag, Task, TaskStatus, EPHEMERAL_ID};

// Optional: Redis-backed broker.
// Enable with: `--features redis`
#[cfg(feature = "redis")]
pub use brokers::RedisBroker;
