//! Bounded retry with random inter-attempt delays
//!
//! Every failure is retried until the attempt budget runs out; the cause of a
//! failure is not inspected. The closure receives the zero-based attempt number
//! so callers can vary a configuration per attempt (see
//! [`ExtractionProfile::for_attempt`](crate::extractor::ExtractionProfile::for_attempt)).
//!
//! # Example
//!
//! ```no_run
//! use media_dl::config::RetryPolicy;
//! use media_dl::retry::retry;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::download();
//! let bytes = retry(&policy, |attempt| async move {
//!     if attempt < 1 { Err("flaky".to_string()) } else { Ok(42u64) }
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryPolicy;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Run `operation` up to `policy.max_attempts` times
///
/// Returns the first success, or the error of the final attempt. Intermediate
/// errors are logged and dropped.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 || policy.delay_first_attempt {
            let delay = random_delay(policy.min_delay, policy.max_delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt + 1 < max_attempts => {
                attempt += 1;
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    "Operation failed, retrying"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    attempts = attempt + 1,
                    "Operation failed after all retry attempts exhausted"
                );
                return Err(e);
            }
        }
    }
}

/// Uniform random delay in `[min, max]`; an inverted range collapses to `min`
fn random_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let secs = rand::thread_rng().gen_range(min.as_secs_f64()..=max.as_secs_f64());
    Duration::from_secs_f64(secs)
}
