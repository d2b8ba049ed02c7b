//! # The supplier activity loop.
//!
//! [`run_supplier`] is the one loop every strategy runs under:
//!
//! ```text
//! start(token)
//! loop {
//!   ├─► fetch()                         (blocking, cancel-aware)
//!   │     ├─ Ok(None)        → cancelled, exit
//!   │     ├─ Err(NonCritical)→ warn, continue
//!   │     └─ Err(Critical)   → error, retry-wait or exit
//!   ├─► dispatch(task)
//!   │     ├─ Err(Critical)   → error, retry-wait or exit
//!   │     └─ otherwise       → warn on failure
//!   └─► pace(outcome)                   (strategy-specific delay)
//! }
//! drain()                               (await in-flight workers)
//! ```
//!
//! ## Rules
//! - A dispatch that has started is never abandoned; cancellation is observed
//!   only between tasks and inside blocking waits.
//! - The retry-wait sleep is cancellable: a cancelled supplier never sits
//!   out its full Critical backoff.

use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{ErrorKind, FlumeError};
use crate::policies::RetryPolicy;
use crate::suppliers::TaskSource;

/// Runs one supplier until cancellation (or a Critical failure with
/// `never_stop` off).
pub async fn run_supplier<S: TaskSource + ?Sized>(
    source: &S,
    policy: RetryPolicy,
    token: CancellationToken,
) {
    info!(source = source.name(), "supplier started");
    source.start(&token);

    loop {
        if token.is_cancelled() {
            break;
        }

        let task = match source.fetch(&token).await {
            Ok(Some(task)) => task,
            Ok(None) => break,
            Err(e) => match e.kind() {
                ErrorKind::Critical => {
                    if !retry_wait(source, &e, policy, &token).await {
                        break;
                    }
                    continue;
                }
                _ => {
                    warn!(source = source.name(), error = %e, "skipping item");
                    continue;
                }
            },
        };

        let outcome = source.dispatch(task).await;
        match &outcome {
            Err(e) if e.is_critical() => {
                if !retry_wait(source, e, policy, &token).await {
                    break;
                }
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "task processing failed");
                source.pace(&outcome, &token).await;
            }
            Ok(()) => {
                source.pace(&outcome, &token).await;
            }
        }
    }

    source.drain().await;
    info!(source = source.name(), "supplier stopped");
}

/// Logs a Critical failure and applies the retry policy.
///
/// Returns `true` to continue the loop, `false` to stop the supplier.
async fn retry_wait<S: TaskSource + ?Sized>(
    source: &S,
    err: &FlumeError,
    policy: RetryPolicy,
    token: &CancellationToken,
) -> bool {
    error!(source = source.name(), error = %err, "critical failure in supplier");
    if !policy.never_stop {
        return false;
    }
    let sleep = time::sleep(policy.retry_wait);
    tokio::pin!(sleep);
    select! {
        _ = &mut sleep => true,
        _ = token.cancelled() => false,
    }
}
