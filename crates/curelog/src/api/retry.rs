//! Backoff policy for pipeline API calls.
//!
//! A curation run makes one call per changed section plus one per audit; a
//! single rate-limit response should not sink the whole batch. Failed calls
//! are classified against the error strings
//! [`OpenRouterClient::chat`](crate::OpenRouterClient::chat) produces, and
//! only [`Transient`](ErrorClass::Transient) ones are retried, with
//! exponentially growing, capped, jittered delays.

use std::time::Duration;

/// How a failed chat call should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying: rate limits, server-side failures, transport hiccups.
    Transient,
    /// Retrying cannot help: bad request, bad key, unparseable response.
    Permanent,
}

/// Classify an error string from [`OpenRouterClient::chat`](crate::OpenRouterClient::chat).
///
/// The client produces three shapes of error: `OpenRouter API HTTP {status}: ...`
/// for non-2xx responses, `request failed: ...` / `failed to read response: ...`
/// for reqwest transport problems (timeouts included), and parse or
/// empty-response errors. Status 429 and the 5xx family are transient, any
/// other status is permanent; transport problems are transient; everything
/// else — including a body that would not parse — is permanent.
pub fn classify_error(error: &str) -> ErrorClass {
    if let Some(status) = http_status(error) {
        return if status == 429 || (500..=599).contains(&status) {
            ErrorClass::Transient
        } else {
            ErrorClass::Permanent
        };
    }
    if error.starts_with("request failed:") || error.starts_with("failed to read response") {
        return ErrorClass::Transient;
    }
    ErrorClass::Permanent
}

/// Pull the status code out of an `... HTTP {status}: ...` error string.
fn http_status(error: &str) -> Option<u16> {
    let (_, rest) = error.split_once("HTTP ")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (0 = no retries, just fail immediately).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling on the delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier applied per attempt.
    pub multiplier: f64,
    /// Whether to damp delays so concurrent section retries spread out.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a config with the given number of retries. Uses sensible defaults.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    /// The delay before retry number `attempt` (0-indexed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let grown = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = grown.min(self.max_delay.as_secs_f64());

        if self.jitter {
            // Deterministic damping cycle keyed on the attempt number —
            // enough spread for concurrent sections without pulling in rand.
            const DAMPING: [f64; 4] = [0.7, 0.95, 0.6, 0.85];
            Duration::from_secs_f64(capped * DAMPING[attempt as usize % DAMPING.len()])
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        assert_eq!(
            classify_error("OpenRouter API HTTP 429 Too Many Requests: slow down"),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error("OpenRouter API HTTP 502 Bad Gateway: upstream"),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error("OpenRouter API HTTP 503: overloaded"),
            ErrorClass::Transient
        );
    }

    #[test]
    fn client_errors_are_permanent() {
        assert_eq!(
            classify_error("OpenRouter API HTTP 400: bad request"),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error("OpenRouter API HTTP 401: invalid key"),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error("OpenRouter API HTTP 404: no such model"),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn transport_errors_are_transient() {
        assert_eq!(
            classify_error("request failed: connection reset by peer"),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error("request failed: operation timed out"),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error("failed to read response: body error"),
            ErrorClass::Transient
        );
    }

    #[test]
    fn parse_and_api_errors_are_permanent() {
        assert_eq!(
            classify_error("failed to parse response: expected value at line 1"),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error("OpenRouter API error: model not available"),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error("formatter returned an empty response"),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn status_extraction_handles_reason_phrases() {
        assert_eq!(http_status("OpenRouter API HTTP 429 Too Many Requests: x"), Some(429));
        assert_eq!(http_status("OpenRouter API HTTP 500: x"), Some(500));
        assert_eq!(http_status("no status here"), None);
    }

    #[test]
    fn default_config_retries_twice() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn with_retries_sets_count() {
        let config = RetryConfig::with_retries(3);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn delay_grows_exponentially() {
        let config = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(5)
        };
        let d0 = config.backoff_delay(0);
        let d1 = config.backoff_delay(1);
        let d2 = config.backoff_delay(2);

        assert!(d1 > d0, "d1={d1:?} should be > d0={d0:?}");
        assert!(d2 > d1, "d2={d2:?} should be > d1={d1:?}");
    }

    #[test]
    fn delay_capped_at_max() {
        let config = RetryConfig {
            jitter: false,
            max_delay: Duration::from_secs(2),
            ..RetryConfig::with_retries(10)
        };
        assert!(config.backoff_delay(10) <= Duration::from_secs(2));
    }

    #[test]
    fn jitter_only_shrinks_delays() {
        let jittered = RetryConfig::with_retries(4);
        let plain = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(4)
        };
        for attempt in 0..4 {
            assert!(jittered.backoff_delay(attempt) <= plain.backoff_delay(attempt));
        }
    }
}
