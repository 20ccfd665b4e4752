//! Bounded retry for transient catalog failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::catalog::CatalogError;
use crate::error::DownloadError;

/// Errors that know whether trying again may help.
pub trait Transient: Display {
    fn is_transient(&self) -> bool;
}

impl Transient for CatalogError {
    fn is_transient(&self) -> bool {
        CatalogError::is_transient(self)
    }
}

impl Transient for DownloadError {
    /// Only catalog trouble is worth repeating; local write failures are not.
    fn is_transient(&self) -> bool {
        match self {
            DownloadError::CatalogUnavailable(e) => e.is_transient(),
            DownloadError::NoMatchFound(_) | DownloadError::WriteFailure { .. } => false,
        }
    }
}

/// Retry schedule: `initial_backoff`, then doubling, up to `max_attempts` tries in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exp)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only errors where [`Transient::is_transient`] holds are retried.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        E: Transient,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::debug!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
