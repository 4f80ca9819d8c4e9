//! Retry executor for upstream calls
//!
//! Each call runs as a small state machine:
//!
//! ```text
//! Attempting -> Succeeded
//! Attempting -> RateLimited -> Waiting -> Attempting
//! Attempting -> RateLimited -> Failed      (retries exhausted)
//! Attempting -> Failed                     (any other error)
//! ```
//!
//! Only 429 responses are retried. The proactive throttle runs once,
//! before the first attempt.

use crate::rate_limit::{parse_retry_after, RateLimitHeaders, SharedRateLimitState};
use routewise_core::{
    Clock, ConfigStore, RetryConfig, RoutewiseError, Sleeper, SyncError, SystemClock,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Successful upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse<T> {
    pub body: T,
    pub rate_limit: RateLimitHeaders,
}

/// Failed upstream call, before retry classification.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamFailure {
    /// HTTP 429
    RateLimited {
        retry_after: Option<String>,
        rate_limit: RateLimitHeaders,
    },
    /// Any other non-success status
    Status {
        status: u16,
        message: String,
        rate_limit: RateLimitHeaders,
    },
    /// The request never produced a response
    Transport { reason: String },
    /// A success status with a body that could not be decoded
    InvalidResponse {
        reason: String,
        rate_limit: RateLimitHeaders,
    },
}

impl UpstreamFailure {
    pub fn rate_limit(&self) -> Option<&RateLimitHeaders> {
        match self {
            UpstreamFailure::RateLimited { rate_limit, .. }
            | UpstreamFailure::Status { rate_limit, .. }
            | UpstreamFailure::InvalidResponse { rate_limit, .. } => Some(rate_limit),
            UpstreamFailure::Transport { .. } => None,
        }
    }

    /// Error for a failure that will not be retried.
    fn into_error(self, context: &str, attempts: u32, retry_after_ms: Option<u64>) -> RoutewiseError {
        let context = context.to_string();
        match self {
            UpstreamFailure::RateLimited { .. } => SyncError::RateLimited {
                context,
                attempts,
                retry_after_ms,
            },
            UpstreamFailure::Status { status, message, .. } => SyncError::RequestFailed {
                context,
                status,
                message,
            },
            UpstreamFailure::Transport { reason } => SyncError::Transport { context, reason },
            UpstreamFailure::InvalidResponse { reason, .. } => {
                SyncError::InvalidResponse { context, reason }
            }
        }
        .into()
    }
}

/// `Sleeper` backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Where the executor reads its retry settings from.
#[derive(Clone)]
enum RetrySource {
    Fixed(RetryConfig),
    /// Follows config reloads
    Live(Arc<ConfigStore>),
}

impl RetrySource {
    fn current(&self) -> RetryConfig {
        match self {
            RetrySource::Fixed(config) => *config,
            RetrySource::Live(store) => store.current().retry,
        }
    }
}

enum RetryState<T> {
    Attempting { attempt: u32 },
    Waiting { attempt: u32, delay: Duration },
    Succeeded(T),
    Failed(RoutewiseError),
}

/// Runs upstream operations with throttling and 429 retries.
#[derive(Clone)]
pub struct ResilientExecutor {
    retry: RetrySource,
    rate_limit: SharedRateLimitState,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl ResilientExecutor {
    pub fn new(retry: RetryConfig) -> Self {
        Self::with_source(RetrySource::Fixed(retry))
    }

    /// Executor that picks up retry settings from every config reload.
    pub fn from_config_store(store: Arc<ConfigStore>) -> Self {
        Self::with_source(RetrySource::Live(store))
    }

    fn with_source(retry: RetrySource) -> Self {
        Self {
            retry,
            rate_limit: SharedRateLimitState::new(),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_rate_limit_state(mut self, state: SharedRateLimitState) -> Self {
        self.rate_limit = state;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn rate_limit_state(&self) -> &SharedRateLimitState {
        &self.rate_limit
    }

    /// Retry settings the next call will use.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.current()
    }

    /// Run `operation` until it succeeds, fails with a non-retryable
    /// error, or exhausts the retry budget on 429s.
    ///
    /// `operation` receives the 0-based attempt number.
    pub async fn execute_with_retry<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T, RoutewiseError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<UpstreamResponse<T>, UpstreamFailure>>,
    {
        let retry = self.retry.current();
        let mut state = RetryState::Attempting { attempt: 0 };

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    if attempt == 0 {
                        self.throttle(context).await;
                    }
                    self.attempt(&retry, context, attempt, operation(attempt).await)
                }
                RetryState::Waiting { attempt, delay } => {
                    tracing::warn!(
                        context,
                        attempt = attempt + 1,
                        max_retries = retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Upstream rate limited; retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    RetryState::Attempting { attempt: attempt + 1 }
                }
                RetryState::Succeeded(body) => return Ok(body),
                RetryState::Failed(error) => return Err(error),
            };
        }
    }

    async fn throttle(&self, context: &str) {
        if let Some(delay) = self.rate_limit.throttle_delay(self.clock.now()) {
            let state = self.rate_limit.snapshot();
            tracing::warn!(
                context,
                remaining = ?state.remaining,
                limit = ?state.limit,
                delay_ms = delay.as_millis() as u64,
                "Upstream quota nearly exhausted; throttling"
            );
            self.sleeper.sleep(delay).await;
        }
    }

    fn attempt<T>(
        &self,
        retry: &RetryConfig,
        context: &str,
        attempt: u32,
        result: Result<UpstreamResponse<T>, UpstreamFailure>,
    ) -> RetryState<T> {
        let now = self.clock.now();
        match result {
            Ok(response) => {
                self.rate_limit.update(&response.rate_limit, now);
                RetryState::Succeeded(response.body)
            }
            Err(failure) => {
                if let Some(headers) = failure.rate_limit() {
                    self.rate_limit.update(headers, now);
                }
                let retry_after = match &failure {
                    UpstreamFailure::RateLimited { retry_after, .. } => Some(retry_after.clone()),
                    _ => None,
                };
                let Some(retry_after) = retry_after else {
                    tracing::debug!(context, attempt, failure = ?failure, "Upstream call failed");
                    return RetryState::Failed(failure.into_error(context, attempt + 1, None));
                };

                let hint = retry_after.as_deref().and_then(|v| parse_retry_after(v, now));
                if attempt >= retry.max_retries {
                    let hint_ms = hint.map(|d| d.as_millis() as u64);
                    tracing::warn!(context, attempts = attempt + 1, "Upstream rate limit retries exhausted");
                    RetryState::Failed(failure.into_error(context, attempt + 1, hint_ms))
                } else {
                    let delay = hint.unwrap_or_else(|| retry.backoff_for_attempt(attempt));
                    RetryState::Waiting { attempt, delay }
                }
            }
        }
    }
}

impl std::fmt::Debug for ResilientExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("retry", &self.retry.current())
            .field("rate_limit", &self.rate_limit.snapshot())
            .finish()
    }
}
