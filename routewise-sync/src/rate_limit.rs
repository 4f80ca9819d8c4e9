//! Upstream rate-limit tracking
//!
//! Every upstream response (successful or not) may carry
//! `x-ratelimit-*` headers. The latest values are kept in one shared
//! [`RateLimitState`] so the retry executor can slow down before the
//! upstream starts rejecting requests.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use routewise_core::Timestamp;
use std::sync::Arc;
use std::time::Duration;

pub const HEADER_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RESET: &str = "x-ratelimit-reset";
pub const HEADER_RETRY_AFTER: &str = "retry-after";

/// Reset values above this are epoch seconds, below it seconds-until-reset.
const EPOCH_RESET_CUTOFF: u64 = 1_000_000_000;

const LOW_REMAINING: u64 = 20;
const CRITICAL_REMAINING: u64 = 10;
const HIGH_USAGE_PERCENT: f64 = 95.0;
const LOW_REMAINING_RESET_SECS: i64 = 300;
const HIGH_USAGE_RESET_SECS: i64 = 120;

const CRITICAL_DELAY: Duration = Duration::from_millis(3000);
const LOW_DELAY: Duration = Duration::from_millis(1000);
const HIGH_USAGE_DELAY: Duration = Duration::from_millis(500);

/// Raw rate-limit header values from one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
}

impl RateLimitHeaders {
    /// Read the headers through `lookup`, which returns a header value by
    /// lowercase name. Unparseable values are ignored.
    pub fn from_lookup<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            limit: number(HEADER_LIMIT),
            remaining: number(HEADER_REMAINING),
            reset: number(HEADER_RESET),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.remaining.is_none() && self.reset.is_none()
    }

    /// Absolute reset time. Large values are epoch seconds, small ones are
    /// seconds from `now`.
    pub fn reset_at(&self, now: Timestamp) -> Option<Timestamp> {
        let reset = self.reset?;
        if reset > EPOCH_RESET_CUTOFF {
            DateTime::<Utc>::from_timestamp(i64::try_from(reset).ok()?, 0)
        } else {
            Some(now + chrono::Duration::seconds(i64::try_from(reset).ok()?))
        }
    }
}

/// Last known upstream quota.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl RateLimitState {
    /// Merge the headers of one response. Absent headers keep their
    /// previous value.
    pub fn update(&mut self, headers: &RateLimitHeaders, now: Timestamp) {
        if headers.is_empty() {
            return;
        }
        if headers.limit.is_some() {
            self.limit = headers.limit;
        }
        if headers.remaining.is_some() {
            self.remaining = headers.remaining;
        }
        if let Some(reset_at) = headers.reset_at(now) {
            self.reset_at = Some(reset_at);
        }
        self.updated_at = Some(now);
    }

    /// Percentage of the quota already used, when the limit is known.
    pub fn percent_used(&self) -> Option<f64> {
        match (self.limit, self.remaining) {
            (Some(limit), Some(remaining)) if limit > 0 => {
                Some(limit.saturating_sub(remaining) as f64 / limit as f64 * 100.0)
            }
            _ => None,
        }
    }

    /// Delay to apply before the next request, if the quota is close to
    /// exhausted and the window will not reset soon.
    pub fn throttle_delay(&self, now: Timestamp) -> Option<Duration> {
        let remaining = self.remaining?;
        let secs_to_reset = self.reset_at?.signed_duration_since(now).num_seconds();
        let percent_used = self.percent_used().unwrap_or(0.0);

        let low_and_far = remaining < LOW_REMAINING && secs_to_reset > LOW_REMAINING_RESET_SECS;
        let busy_and_far = percent_used > HIGH_USAGE_PERCENT && secs_to_reset > HIGH_USAGE_RESET_SECS;
        if !(low_and_far || busy_and_far) {
            return None;
        }

        if remaining < CRITICAL_REMAINING {
            Some(CRITICAL_DELAY)
        } else if remaining < LOW_REMAINING {
            Some(LOW_DELAY)
        } else if percent_used > HIGH_USAGE_PERCENT {
            Some(HIGH_USAGE_DELAY)
        } else {
            None
        }
    }
}

/// Rate-limit state shared by every request to one upstream.
#[derive(Debug, Clone, Default)]
pub struct SharedRateLimitState {
    inner: Arc<Mutex<RateLimitState>>,
}

impl SharedRateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, headers: &RateLimitHeaders, now: Timestamp) {
        self.inner.lock().update(headers, now);
    }

    pub fn snapshot(&self) -> RateLimitState {
        *self.inner.lock()
    }

    pub fn throttle_delay(&self, now: Timestamp) -> Option<Duration> {
        self.inner.lock().throttle_delay(now)
    }
}

/// Parse a `Retry-After` value: delay seconds, an HTTP-date, or an
/// RFC 3339 timestamp. Dates give the absolute distance from `now`.
pub fn parse_retry_after(value: &str, now: Timestamp) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_millis(secs.saturating_mul(1000)));
    }

    let target = DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()?
        .with_timezone(&Utc);
    let millis = target.signed_duration_since(now).num_milliseconds().unsigned_abs();
    Some(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn headers(limit: u64, remaining: u64, reset: u64) -> RateLimitHeaders {
        RateLimitHeaders {
            limit: Some(limit),
            remaining: Some(remaining),
            reset: Some(reset),
        }
    }

    #[test]
    fn test_lookup_ignores_garbage() {
        let parsed = RateLimitHeaders::from_lookup(|name| match name {
            HEADER_LIMIT => Some("1000"),
            HEADER_REMAINING => Some("not-a-number"),
            _ => None,
        });
        assert_eq!(parsed.limit, Some(1000));
        assert_eq!(parsed.remaining, None);
        assert_eq!(parsed.reset, None);
    }

    #[test]
    fn test_reset_epoch_vs_relative() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let relative = RateLimitHeaders { reset: Some(400), ..Default::default() };
        assert_eq!(relative.reset_at(now), Some(now + chrono::Duration::seconds(400)));

        let epoch = now.timestamp() as u64 + 90;
        let absolute = RateLimitHeaders { reset: Some(epoch), ..Default::default() };
        assert_eq!(absolute.reset_at(now), Some(now + chrono::Duration::seconds(90)));
    }

    #[test]
    fn test_no_headers_never_throttles() {
        let state = RateLimitState::default();
        assert_eq!(state.throttle_delay(Utc::now()), None);

        let mut state = RateLimitState::default();
        state.update(&RateLimitHeaders::default(), Utc::now());
        assert_eq!(state.updated_at, None);
    }

    #[test]
    fn test_throttle_scenarios() {
        let now = Utc::now();
        let mut state = RateLimitState::default();

        state.update(&headers(1000, 5, 400), now);
        assert_eq!(state.throttle_delay(now), Some(Duration::from_millis(3000)));

        state.update(&headers(1000, 15, 400), now);
        assert_eq!(state.throttle_delay(now), Some(Duration::from_millis(1000)));

        state.update(&headers(1000, 500, 400), now);
        assert_eq!(state.throttle_delay(now), None);

        // Low quota but the window resets soon
        state.update(&headers(1000, 5, 60), now);
        assert_eq!(state.throttle_delay(now), None);
    }

    #[test]
    fn test_high_usage_throttle() {
        let now = Utc::now();
        let mut state = RateLimitState::default();
        state.update(&headers(1000, 30, 150), now);
        assert_eq!(state.throttle_delay(now), Some(Duration::from_millis(500)));

        state.update(&headers(1000, 30, 100), now);
        assert_eq!(state.throttle_delay(now), None);
    }

    #[test]
    fn test_partial_update_keeps_previous_values() {
        let now = Utc::now();
        let mut state = RateLimitState::default();
        state.update(&headers(1000, 900, 60), now);
        state.update(&RateLimitHeaders { remaining: Some(850), ..Default::default() }, now);
        assert_eq!(state.limit, Some(1000));
        assert_eq!(state.remaining, Some(850));
        assert!(state.reset_at.is_some());
    }

    #[test]
    fn test_retry_after_formats() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_retry_after("2", now), Some(Duration::from_millis(2000)));
        assert_eq!(parse_retry_after(" 0 ", now), Some(Duration::ZERO));
        assert_eq!(
            parse_retry_after("Sun, 01 Mar 2026 12:00:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("2026-03-01T12:00:05Z", now),
            Some(Duration::from_secs(5))
        );
        // Dates in the past still give the absolute distance
        assert_eq!(
            parse_retry_after("2026-03-01T11:59:50Z", now),
            Some(Duration::from_secs(10))
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn test_shared_state_is_shared() {
        let shared = SharedRateLimitState::new();
        let clone = shared.clone();
        clone.update(&headers(100, 1, 1000), Utc::now());
        assert_eq!(shared.snapshot().remaining, Some(1));
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The throttle only ever picks one of the three fixed delays
        #[test]
        fn prop_throttle_delay_is_bounded(
            limit in 1u64..5000,
            remaining in 0u64..5000,
            reset in 0u64..3600,
        ) {
            let now = Utc::now();
            let mut state = RateLimitState::default();
            state.update(&RateLimitHeaders { limit: Some(limit), remaining: Some(remaining), reset: Some(reset) }, now);
            if let Some(delay) = state.throttle_delay(now) {
                prop_assert!([CRITICAL_DELAY, LOW_DELAY, HIGH_USAGE_DELAY].contains(&delay));
                prop_assert!(reset > 120);
            }
        }

        /// A plentiful quota never throttles
        #[test]
        fn prop_plenty_of_quota_never_throttles(limit in 100u64..5000, reset in 0u64..3600) {
            let now = Utc::now();
            let mut state = RateLimitState::default();
            state.update(&RateLimitHeaders { limit: Some(limit), remaining: Some(limit / 2), reset: Some(reset) }, now);
            prop_assert_eq!(state.throttle_delay(now), None);
        }
    }
}
