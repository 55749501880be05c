use crate::error::Result;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Bounded retry with a fixed delay between attempts.
///
/// An attempt whose precondition does not hold is consumed without running
/// the action. An attempt whose action fails is consumed too, and the wait
/// before the next one is multiplied by `error_backoff_factor`. There is no
/// wait after the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub error_backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
            error_backoff_factor: 2,
        }
    }
}

/// Why an attempt did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    PreconditionNotMet,
    ActionFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RetryOutcome {
    Succeeded { attempt: u32 },
    Exhausted { attempts: u32, last_error: Option<String> },
}

impl RetryOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

impl RetryPolicy {
    /// Wait before the next attempt after a failed one
    pub fn delay_after(&self, failure: AttemptFailure) -> Duration {
        match failure {
            AttemptFailure::PreconditionNotMet => self.delay,
            AttemptFailure::ActionFailed => self.delay * self.error_backoff_factor.max(1),
        }
    }

    /// Run `action` once `precondition` holds, up to `max_attempts` times.
    ///
    /// `action` receives the 1-based attempt number.
    pub async fn run<P, A, F>(&self, mut precondition: P, mut action: A) -> RetryOutcome
    where
        P: FnMut() -> bool,
        A: FnMut(u32) -> F,
        F: Future<Output = Result<()>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            let failure = if precondition() {
                match action(attempt).await {
                    Ok(()) => {
                        info!("Attempt {}/{} succeeded", attempt, self.max_attempts);
                        return RetryOutcome::Succeeded { attempt };
                    }
                    Err(e) => {
                        warn!("Attempt {}/{} failed: {}", attempt, self.max_attempts, e);
                        last_error = Some(e.to_string());
                        AttemptFailure::ActionFailed
                    }
                }
            } else {
                info!(
                    "Attempt {}/{} skipped, preconditions not met",
                    attempt, self.max_attempts
                );
                AttemptFailure::PreconditionNotMet
            };

            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay_after(failure)).await;
            }
        }

        RetryOutcome::Exhausted {
            attempts: self.max_attempts,
            last_error,
        }
    }
}
