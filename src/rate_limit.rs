use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use crate::api::AppState;

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    /// Absolute window end, milliseconds since epoch.
    reset_at: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub limited: bool,
    pub remaining: u32,
    pub reset_at: i64,
}

impl RateLimitDecision {
    /// Seconds until the window resets, rounded up, never negative.
    pub fn retry_after_secs(&self, now_ms: i64) -> i64 {
        ((self.reset_at - now_ms).max(0) + 999) / 1000
    }
}

/// Fixed-window request counter keyed by client identifier.
///
/// State lives in process memory only; a restart clears all counters.
/// Expired entries are swept synchronously on every call rather than by a
/// background task.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    limit: u32,
    window_ms: i64,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            limit,
            window_ms: window.as_millis() as i64,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Utc::now().timestamp_millis())
    }

    fn check_at(&self, identifier: &str, now_ms: i64) -> RateLimitDecision {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Opportunistic cleanup of every expired window.
        entries.retain(|_, entry| now_ms <= entry.reset_at);

        match entries.get_mut(identifier) {
            Some(entry) => {
                if entry.count >= self.limit {
                    // Exhausted: do not increment, so rejected calls neither
                    // extend the window nor corrupt the counter.
                    RateLimitDecision {
                        limited: true,
                        remaining: 0,
                        reset_at: entry.reset_at,
                    }
                } else {
                    entry.count += 1;
                    RateLimitDecision {
                        limited: false,
                        remaining: self.limit - entry.count,
                        reset_at: entry.reset_at,
                    }
                }
            }
            None => {
                let reset_at = now_ms + self.window_ms;
                entries.insert(
                    identifier.to_string(),
                    RateLimitEntry { count: 1, reset_at },
                );
                RateLimitDecision {
                    limited: false,
                    remaining: self.limit.saturating_sub(1),
                    reset_at,
                }
            }
        }
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Extract the client identifier from proxy headers.
///
/// Checks `x-forwarded-for` (first comma-separated entry), then `x-real-ip`,
/// then `cf-connecting-ip`. Returns `"unknown"` when none carry a value. The
/// headers are client/proxy-supplied and can be forged without a trusted-proxy
/// allowlist; that is a known limitation of this scheme.
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    for name in ["x-real-ip", "cf-connecting-ip"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    "unknown".to_string()
}

#[derive(Serialize)]
struct RateLimitedBody {
    error: String,
    message: String,
    #[serde(rename = "retryAfter")]
    retry_after: i64,
}

/// Middleware guarding the public search API.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let identifier = client_identifier(request.headers());
    let decision = state.rate_limiter.check(&identifier);
    let limit = state.rate_limiter.limit();

    if decision.limited {
        let retry_after = decision.retry_after_secs(Utc::now().timestamp_millis());
        tracing::warn!("Rate limit exceeded for client {}", identifier);

        let body = RateLimitedBody {
            error: "Rate limit exceeded".to_string(),
            message: "Too many requests. Please try again later.".to_string(),
            retry_after,
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        apply_rate_limit_headers(response.headers_mut(), &decision, limit);
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    let mut response = next.run(request).await;
    apply_rate_limit_headers(response.headers_mut(), &decision, limit);
    response
}

fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision, limit: u32) {
    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("x-ratelimit-limit", value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", value);
    }
    if let Some(reset) = Utc.timestamp_millis_opt(decision.reset_at).single() {
        if let Ok(value) = HeaderValue::from_str(&reset.to_rfc3339()) {
            headers.insert("x-ratelimit-reset", value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(3600);

    #[test]
    fn remaining_decreases_until_limit_is_reached() {
        let limiter = RateLimiter::new(100, WINDOW);
        let now = 1_700_000_000_000;

        for call in 1..=100u32 {
            let decision = limiter.check_at("1.2.3.4", now);
            assert!(!decision.limited, "call {} should pass", call);
            assert_eq!(decision.remaining, 100 - call);
        }

        let decision = limiter.check_at("1.2.3.4", now);
        assert!(decision.limited);
        assert_eq!(decision.remaining, 0);

        // Further rejections neither extend the window nor change the counter.
        let again = limiter.check_at("1.2.3.4", now + 1);
        assert!(again.limited);
        assert_eq!(again.reset_at, decision.reset_at);
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = RateLimiter::new(100, WINDOW);
        let now = 1_700_000_000_000;

        for _ in 0..100 {
            limiter.check_at("1.2.3.4", now);
        }
        assert!(limiter.check_at("1.2.3.4", now).limited);

        let later = now + WINDOW.as_millis() as i64 + 1;
        let decision = limiter.check_at("1.2.3.4", later);
        assert!(!decision.limited);
        assert_eq!(decision.remaining, 99);
        assert_eq!(decision.reset_at, later + WINDOW.as_millis() as i64);
    }

    #[test]
    fn identifiers_do_not_share_counters() {
        let limiter = RateLimiter::new(100, WINDOW);
        let now = 1_700_000_000_000;

        for _ in 0..100 {
            limiter.check_at("1.2.3.4", now);
        }
        assert!(limiter.check_at("1.2.3.4", now).limited);

        let other = limiter.check_at("5.6.7.8", now);
        assert!(!other.limited);
        assert_eq!(other.remaining, 99);
    }

    #[test]
    fn sweep_drops_expired_entries() {
        let limiter = RateLimiter::new(100, WINDOW);
        let now = 1_700_000_000_000;

        limiter.check_at("1.2.3.4", now);
        limiter.check_at("5.6.7.8", now);
        assert_eq!(limiter.entry_count(), 2);

        let later = now + WINDOW.as_millis() as i64 + 1;
        limiter.check_at("9.9.9.9", later);
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn retry_after_rounds_up_and_never_goes_negative() {
        let decision = RateLimitDecision {
            limited: true,
            remaining: 0,
            reset_at: 10_500,
        };
        assert_eq!(decision.retry_after_secs(10_000), 1);
        assert_eq!(decision.retry_after_secs(11_000), 0);
    }

    #[test]
    fn client_identifier_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_identifier(&headers), "203.0.113.7");
    }

    #[test]
    fn client_identifier_falls_back_through_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_identifier(&headers), "10.0.0.2");

        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("10.0.0.3"));
        assert_eq!(client_identifier(&headers), "10.0.0.3");

        assert_eq!(client_identifier(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn client_identifier_skips_empty_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_identifier(&headers), "10.0.0.2");
    }
}
