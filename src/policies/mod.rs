//! Policies applied by the supplier loop.

mod retry;

pub use retry::RetryPolicy;
