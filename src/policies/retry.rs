//! # Critical-failure retry policy.
//!
//! [`RetryPolicy`] decides what a supplier does after a Critical failure:
//! wait `retry_wait` and try again, or, when `never_stop` is off, terminate
//! the supplier's activity and require an external restart.
//!
//! NonCritical and Runtime failures never consult this policy; they are
//! logged and the loop continues immediately.

use std::time::Duration;

use crate::config::Config;

/// What a supplier does after a Critical failure.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Pause before the next attempt.
    pub retry_wait: Duration,
    /// Retry forever (`true`) or stop the supplier after logging (`false`).
    pub never_stop: bool,
}

impl RetryPolicy {
    /// Derives the policy from global configuration.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            retry_wait: cfg.retry_wait,
            never_stop: cfg.never_stop,
        }
    }
}

impl Default for RetryPolicy {
    /// Retry forever with a 30 second pause.
    fn default() -> Self {
        Self {
            retry_wait: Duration::from_secs(30),
            never_stop: true,
        }
    }
}
