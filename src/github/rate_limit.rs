// src/github/rate_limit.rs
// =============================================================================
// The rate-limit gate between search pages.
//
// The search API has a small per-minute quota. After every page the crawler
// hands the response headers to the gate; if the remaining quota is at or
// below the configured reserve it sleeps until the window resets.
//
// Headers used:
//   x-ratelimit-remaining  calls left in the current window
//   x-ratelimit-reset      window reset time, epoch seconds
//
// Missing headers never fail the crawl. No `remaining` means no information,
// so the crawl proceeds. An exhausted quota with an unreadable reset time
// waits a short fallback delay instead of guessing.
// =============================================================================

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Extra time past the advertised reset, to absorb clock skew.
const RESET_MARGIN: Duration = Duration::from_secs(1);

const FALLBACK_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RateLimitGate {
    reserve: u64,
    fallback: Duration,
}

impl Default for RateLimitGate {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RateLimitGate {
    /// `reserve` is how many calls to leave unused before waiting; 0 waits
    /// only once the quota is exhausted.
    pub fn new(reserve: u64) -> Self {
        Self {
            reserve,
            fallback: FALLBACK_DELAY,
        }
    }

    /// How long to wait before the next call, or `None` to proceed now.
    pub fn wait_for(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
        let remaining: u64 = header_number(headers, REMAINING_HEADER)?;
        if remaining > self.reserve {
            return None;
        }

        let Some(reset) = header_number::<i64>(headers, RESET_HEADER)
            .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))
        else {
            return Some(self.fallback);
        };

        // A reset time already in the past still gets the margin.
        let until_reset = (reset - now).to_std().unwrap_or(Duration::ZERO);
        Some(until_reset + RESET_MARGIN)
    }

    /// Suspends the caller until the quota allows another call.
    pub async fn await_quota(&self, headers: &HeaderMap) {
        if let Some(delay) = self.wait_for(headers, Utc::now()) {
            tracing::info!(
                delay_secs = delay.as_secs(),
                "Rate limit reached, waiting for reset"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(remaining: Option<&str>, reset: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(value) = remaining {
            map.insert(REMAINING_HEADER, HeaderValue::from_str(value).unwrap());
        }
        if let Some(value) = reset {
            map.insert(RESET_HEADER, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn at(epoch: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(epoch, 0).unwrap()
    }

    #[test]
    fn test_no_headers_proceeds() {
        let gate = RateLimitGate::default();
        assert_eq!(gate.wait_for(&HeaderMap::new(), at(1_000)), None);
    }

    #[test]
    fn test_quota_left_proceeds() {
        let gate = RateLimitGate::default();
        assert_eq!(gate.wait_for(&headers(Some("9"), Some("1060")), at(1_000)), None);
    }

    #[test]
    fn test_exhausted_waits_until_reset() {
        let gate = RateLimitGate::default();
        let wait = gate.wait_for(&headers(Some("0"), Some("1060")), at(1_000));
        assert_eq!(wait, Some(Duration::from_secs(61)));
    }

    #[test]
    fn test_reserve_triggers_early_wait() {
        let gate = RateLimitGate::new(2);
        let wait = gate.wait_for(&headers(Some("2"), Some("1010")), at(1_000));
        assert_eq!(wait, Some(Duration::from_secs(11)));
        assert_eq!(gate.wait_for(&headers(Some("3"), Some("1010")), at(1_000)), None);
    }

    #[test]
    fn test_reset_in_the_past_waits_margin_only() {
        let gate = RateLimitGate::default();
        let wait = gate.wait_for(&headers(Some("0"), Some("900")), at(1_000));
        assert_eq!(wait, Some(RESET_MARGIN));
    }

    #[test]
    fn test_malformed_reset_uses_fallback() {
        let gate = RateLimitGate::default();
        assert_eq!(
            gate.wait_for(&headers(Some("0"), Some("soon")), at(1_000)),
            Some(FALLBACK_DELAY)
        );
        assert_eq!(gate.wait_for(&headers(Some("0"), None), at(1_000)), Some(FALLBACK_DELAY));
    }

    #[test]
    fn test_malformed_remaining_proceeds() {
        let gate = RateLimitGate::default();
        assert_eq!(gate.wait_for(&headers(Some("lots"), Some("1060")), at(1_000)), None);
    }
}
