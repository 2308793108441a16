//! Call Retry Policy
//!
//! Drives one phase through its state machine for a single logical call:
//! per-attempt timeout, bounded exponential backoff on transient failures,
//! immediate failure on fatal ones, and cancellation at any await point.

use std::future::Future;
use std::time::{Duration, Instant};

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use recap_llm::{LlmError, LlmResult, ModelError};

use crate::models::phase::{AttemptOutcome, CallAttempt, PhaseRecord, PhaseState};
use crate::models::settings::{AnalyzerConfig, RetryConfig};

/// How a retried call ended.
#[derive(Debug)]
pub enum CallOutcome<T> {
    Succeeded(T),
    /// Final error after retries, or the first fatal one
    Failed(LlmError),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    jitter: f64,
    call_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(retry: &RetryConfig, call_timeout: Duration) -> Self {
        Self {
            max_attempts: retry.max_attempts.max(1),
            initial_backoff: Duration::from_millis(retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(retry.max_backoff_ms),
            multiplier: retry.multiplier,
            jitter: retry.jitter,
            call_timeout,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(&config.retry, Duration::from_secs(config.call_timeout_secs))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_backoff)
            .with_randomization_factor(self.jitter)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Delay before the next attempt. A server `retry-after` hint raises it,
    /// never beyond the configured maximum.
    fn next_delay(&self, backoff: &mut ExponentialBackoff, error: &LlmError) -> Duration {
        let delay = backoff.next_backoff().unwrap_or(self.max_backoff);
        match error.retry_after() {
            Some(secs) => delay
                .max(Duration::from_secs(u64::from(secs)))
                .min(self.max_backoff),
            None => delay,
        }
    }

    /// Run `call` until it succeeds, fails fatally, runs out of attempts, or
    /// `cancel` fires. Every attempt is appended to `record`.
    pub async fn run<T, F, Fut>(
        &self,
        record: &mut PhaseRecord,
        cancel: &CancellationToken,
        mut call: F,
    ) -> CallOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LlmResult<T>>,
    {
        let mut backoff = self.backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            advance(record, PhaseState::InFlight);
            let started_at = chrono::Utc::now().to_rfc3339();
            let start = Instant::now();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = tokio::time::timeout(self.call_timeout, call()) => Some(r),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let (outcome, error) = match result {
                None => {
                    record.record_attempt(CallAttempt::cancelled(attempt, duration_ms, started_at));
                    advance(record, PhaseState::Cancelled);
                    debug!("Phase '{}' cancelled during attempt {}", record.id, attempt);
                    return CallOutcome::Cancelled;
                }
                Some(Ok(Ok(value))) => {
                    record.record_attempt(CallAttempt::success(attempt, duration_ms, started_at));
                    advance(record, PhaseState::Succeeded);
                    return CallOutcome::Succeeded(value);
                }
                Some(Ok(Err(error))) => (AttemptOutcome::Failed, error),
                Some(Err(_elapsed)) => (
                    AttemptOutcome::TimedOut,
                    LlmError::timeout(format!(
                        "call exceeded {}ms",
                        self.call_timeout.as_millis()
                    )),
                ),
            };

            let model_error = ModelError::from(&error);
            record.record_attempt(CallAttempt::failure(
                attempt,
                outcome,
                &model_error,
                duration_ms,
                started_at,
            ));

            if !error.is_transient() || error.is_configuration() {
                warn!(
                    "Phase '{}' failed fatally on attempt {}: {}",
                    record.id, attempt, error
                );
                advance(record, PhaseState::FailedFatal);
                record.error = Some(model_error);
                return CallOutcome::Failed(error);
            }

            advance(record, PhaseState::FailedRetryable);
            if attempt >= self.max_attempts {
                warn!(
                    "Phase '{}' exhausted {} attempts: {}",
                    record.id, self.max_attempts, error
                );
                advance(record, PhaseState::FailedFatal);
                record.error = Some(model_error);
                return CallOutcome::Failed(error);
            }

            let delay = self.next_delay(&mut backoff, &error);
            warn!(
                "Phase '{}' attempt {}/{} failed ({}), retrying in {}ms",
                record.id,
                attempt,
                self.max_attempts,
                error,
                delay.as_millis()
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    advance(record, PhaseState::Cancelled);
                    return CallOutcome::Cancelled;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn advance(record: &mut PhaseRecord, next: PhaseState) {
    if let Err(e) = record.transition(next) {
        warn!("{}", e);
    }
}
