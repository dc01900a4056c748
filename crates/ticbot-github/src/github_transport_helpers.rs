use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Upper bound for a single backoff sleep.
pub(crate) const MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Error bodies are truncated to this many characters.
pub(crate) const ERROR_BODY_LIMIT: usize = 800;

pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

/// Backoff before retry number `attempt` (1-based), floored at the base delay
/// when the server sent `Retry-After`.
pub(crate) fn retry_delay(
    base_delay_ms: u64,
    attempt: usize,
    retry_after: Option<Duration>,
) -> Duration {
    if let Some(delay) = retry_after {
        return delay
            .max(Duration::from_millis(base_delay_ms))
            .min(Duration::from_millis(MAX_RETRY_DELAY_MS));
    }
    let exponent = attempt.saturating_sub(1).min(10) as u32;
    let scaled = base_delay_ms.saturating_mul(2_u64.saturating_pow(exponent));
    Duration::from_millis(scaled.min(MAX_RETRY_DELAY_MS))
}

pub(crate) fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

pub(crate) fn is_retryable_github_status(status: u16) -> bool {
    status == 429 || status >= 500
}

pub(crate) fn is_authorization_status(status: u16) -> bool {
    status == 401 || status == 403
}

pub(crate) fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
