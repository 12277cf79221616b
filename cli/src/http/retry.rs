//! Retry policy for idempotent-enough backend calls

use std::future::Future;

use tracing::warn;

use crate::errors::CliError;
use crate::storage::settings::RetrySettings;
use crate::utils::{calc_exp_backoff, CooldownOptions};

/// Retries an operation with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub cooldown: CooldownOptions,
    /// Errors for which another attempt is made
    pub retryable: fn(&CliError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown: CooldownOptions::default(),
            retryable: is_transient,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            cooldown: settings.cooldown(),
            retryable: is_transient,
        }
    }
}

/// Error returned once a retried operation gives up
#[derive(Debug)]
pub struct RetryFailure {
    /// Attempts made, including the first
    pub attempts: u32,
    /// True when the last error was retryable but no attempts were left
    pub exhausted: bool,
    pub error: CliError,
}

impl From<RetryFailure> for CliError {
    fn from(failure: RetryFailure) -> Self {
        failure.error
    }
}

/// Connection failures and timeouts; HTTP error statuses are not transient
pub fn is_transient(err: &CliError) -> bool {
    match err {
        CliError::HttpError(e) => e.is_connect() || e.is_timeout() || e.is_request(),
        _ => false,
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CliError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if (self.retryable)(&error) => {
                    if attempt >= max_attempts {
                        warn!("{} failed after {} attempts: {}", label, attempt, error);
                        return Err(RetryFailure {
                            attempts: attempt,
                            exhausted: true,
                            error,
                        });
                    }
                    let delay = calc_exp_backoff(&self.cooldown, attempt - 1);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label, attempt, max_attempts, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    return Err(RetryFailure {
                        attempts: attempt,
                        exhausted: false,
                        error,
                    })
                }
            }
        }
    }
}
