//! Rate-limit bookkeeping and retry timing for the Trakt executor.
//!
//! Trakt reports the remaining call budget and its reset time on every
//! response. The executor records them here and consults the state before
//! each attempt.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Reset values at or above this are unix timestamps (2001-09-09), even when
/// they already lie in the past. Smaller values are seconds from now.
const EPOCH_RESET_THRESHOLD: i64 = 1_000_000_000;

/// Highest shift applied to the base delay. Anything larger is clamped to
/// `max_delay` anyway.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Last rate-limit budget reported by Trakt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
    /// Record the budget from response headers. Missing or unparsable
    /// values keep the previous state.
    pub fn update(&mut self, headers: &HeaderMap, now: DateTime<Utc>) {
        if let Some(remaining) = header_value::<u32>(headers, RATE_LIMIT_REMAINING) {
            self.remaining = Some(remaining);
        }
        if let Some(reset_at) =
            header_value::<i64>(headers, RATE_LIMIT_RESET).and_then(|raw| parse_reset(raw, now))
        {
            self.reset_at = Some(reset_at);
        }
    }

    /// How long to hold off before the next call, if at all.
    ///
    /// Only an exhausted budget with a reset time still ahead of `now`
    /// blocks. An unknown or past reset never does.
    pub fn wait_duration(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.remaining != Some(0) {
            return None;
        }
        let reset_at = self.reset_at?;
        (reset_at - now).to_std().ok().filter(|wait| !wait.is_zero())
    }
}

/// Interpret an `X-Ratelimit-Reset` value, either seconds-from-now or an
/// absolute unix timestamp.
pub fn parse_reset(raw: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if raw >= EPOCH_RESET_THRESHOLD {
        Utc.timestamp_opt(raw, 0).single()
    } else {
        chrono::Duration::try_seconds(raw).and_then(|delta| now.checked_add_signed(delta))
    }
}

/// Server hint for how long to wait before retrying.
///
/// Reads `Retry-After` as delta-seconds or an HTTP date, falling back to the
/// rate-limit reset header.
pub fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    if let Some(value) = headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok()) {
        let value = value.trim();
        if let Ok(secs) = value.parse::<u64>() {
            return Some(Duration::from_secs(secs));
        }
        if let Ok(at) = DateTime::parse_from_rfc2822(value) {
            return Some(until(at.with_timezone(&Utc), now));
        }
    }

    header_value::<i64>(headers, RATE_LIMIT_RESET)
        .and_then(|raw| parse_reset(raw, now))
        .map(|at| until(at, now))
}

fn until(at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (at - now).to_std().unwrap_or(Duration::ZERO)
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Attempt budget and backoff bounds for retried requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay after the given 1-based attempt, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay
            .checked_mul(1u32 << shift)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Delay before the next attempt, honoring a server hint when it is longer.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let backoff = self.backoff(attempt);
        hint.map_or(backoff, |hint| hint.max(backoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
        assert_eq!(policy.backoff(5), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_never_exceeds_cap() {
        let policy = RetryPolicy::default();
        for attempt in 0..=64 {
            assert!(policy.backoff(attempt) <= policy.max_delay, "attempt {}", attempt);
        }
        assert_eq!(policy.backoff(u32::MAX), policy.max_delay);
    }

    #[test]
    fn test_backoff_with_huge_base_does_not_overflow() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(u64::MAX / 2),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(policy.backoff(40), Duration::from_secs(30));
    }

    #[test]
    fn test_delay_prefers_longer_hint() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1, Some(Duration::from_secs(3))), Duration::from_secs(3));
        assert_eq!(policy.delay_for(3, Some(Duration::from_millis(10))), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2, None), Duration::from_secs(1));
    }

    #[test]
    fn test_exhausted_budget_with_future_reset_waits() {
        let state = RateLimitState {
            remaining: Some(0),
            reset_at: Some(now() + chrono::Duration::seconds(10)),
        };
        assert_eq!(state.wait_duration(now()), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_unknown_or_past_reset_does_not_wait() {
        let unset = RateLimitState {
            remaining: Some(0),
            reset_at: None,
        };
        let past = RateLimitState {
            remaining: Some(0),
            reset_at: Some(now() - chrono::Duration::seconds(5)),
        };
        let at_now = RateLimitState {
            remaining: Some(0),
            reset_at: Some(now()),
        };
        assert_eq!(unset.wait_duration(now()), None);
        assert_eq!(past.wait_duration(now()), None);
        assert_eq!(at_now.wait_duration(now()), None);
    }

    #[test]
    fn test_past_epoch_reset_does_not_wait() {
        let mut state = RateLimitState::default();
        let past = (now() - chrono::Duration::hours(1)).timestamp();
        state.update(
            &headers(&[(RATE_LIMIT_REMAINING, "0"), (RATE_LIMIT_RESET, &past.to_string())]),
            now(),
        );

        assert_eq!(state.reset_at, Some(now() - chrono::Duration::hours(1)));
        assert_eq!(state.wait_duration(now()), None);
    }

    #[test]
    fn test_near_future_epoch_reset_is_absolute() {
        let soon = (now() + chrono::Duration::seconds(20)).timestamp();
        assert_eq!(parse_reset(soon, now()), Some(now() + chrono::Duration::seconds(20)));
    }

    #[test]
    fn test_remaining_budget_does_not_wait() {
        let state = RateLimitState {
            remaining: Some(3),
            reset_at: Some(now() + chrono::Duration::seconds(10)),
        };
        assert_eq!(state.wait_duration(now()), None);
    }

    #[test]
    fn test_update_relative_and_absolute_reset() {
        let mut state = RateLimitState::default();
        state.update(&headers(&[(RATE_LIMIT_REMAINING, "0"), (RATE_LIMIT_RESET, "30")]), now());
        assert_eq!(state.remaining, Some(0));
        assert_eq!(state.reset_at, Some(now() + chrono::Duration::seconds(30)));

        let epoch = (now() + chrono::Duration::minutes(5)).timestamp();
        state.update(&headers(&[(RATE_LIMIT_RESET, &epoch.to_string())]), now());
        assert_eq!(state.reset_at, Some(now() + chrono::Duration::minutes(5)));
        assert_eq!(state.remaining, Some(0));
    }

    #[test]
    fn test_update_ignores_garbage() {
        let mut state = RateLimitState {
            remaining: Some(7),
            reset_at: Some(now()),
        };
        state.update(&headers(&[(RATE_LIMIT_REMAINING, "lots"), (RATE_LIMIT_RESET, "")]), now());
        assert_eq!(state.remaining, Some(7));
        assert_eq!(state.reset_at, Some(now()));
    }

    #[test]
    fn test_retry_after_seconds_and_date() {
        assert_eq!(
            retry_after(&headers(&[("retry-after", "4")]), now()),
            Some(Duration::from_secs(4))
        );
        assert_eq!(
            retry_after(&headers(&[("retry-after", "Sat, 01 Mar 2025 12:00:20 GMT")]), now()),
            Some(Duration::from_secs(20))
        );
    }

    #[test]
    fn test_retry_after_falls_back_to_reset_header() {
        assert_eq!(
            retry_after(&headers(&[(RATE_LIMIT_RESET, "12")]), now()),
            Some(Duration::from_secs(12))
        );
        assert_eq!(retry_after(&HeaderMap::new(), now()), None);
    }

    #[test]
    fn test_retry_after_past_epoch_reset_is_zero() {
        let past = (now() - chrono::Duration::minutes(10)).timestamp();
        assert_eq!(
            retry_after(&headers(&[(RATE_LIMIT_RESET, &past.to_string())]), now()),
            Some(Duration::ZERO)
        );
    }
}
