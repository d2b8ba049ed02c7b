//! # Global dispatcher configuration.
//!
//! [`Config`] centralizes process-wide settings shared by the host, the
//! processor, and the supplier retry policy.
//!
//! ## Field semantics
//! - `scripts_root`: directory script names are resolved against
//! - `retry_wait`: pause after a Critical supplier failure before retrying
//! - `never_stop`: keep retrying Critical failures forever, or stop the
//!   supplier after the first retry-exhausting failure
//! - `grace`: maximum wait for suppliers to unwind during shutdown

use std::path::PathBuf;
use std::time::Duration;

/// Global configuration for the dispatcher runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory containing script bodies, resolved per task by name.
    pub scripts_root: PathBuf,

    /// How long a supplier waits after a Critical failure before retrying.
    pub retry_wait: Duration,

    /// If `true`, a supplier retries Critical failures indefinitely; if
    /// `false`, the supplier stops its activity on the first Critical failure.
    pub never_stop: bool,

    /// Maximum time to wait for suppliers to stop during graceful shutdown.
    pub grace: Duration,
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `scripts_root = "scripts"`
    /// - `retry_wait = 30s`
    /// - `never_stop = true`
    /// - `grace = 60s`
    fn default() -> Self {
        Self {
            scripts_root: PathBuf::from("scripts"),
            retry_wait: Duration::from_secs(30),
            never_stop: true,
            grace: Duration::from_secs(60),
        }
    }
}
