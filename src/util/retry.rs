//! Rate-limit retry for outbound calls
//!
//! Both remote gateways (completion service and code host) retry a bounded
//! number of times when the server answers with a rate-limit response. A
//! server-suggested wait is honored when one can be parsed, otherwise the
//! delay grows linearly with the attempt number. Every wait is clamped to a
//! floor so a `0ms` hint cannot turn into a busy loop.

use regex::Regex;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(200);

/// Errors that can tell whether they came from a rate-limit response
pub trait RateLimited {
    fn is_rate_limited(&self) -> bool;

    /// Server-suggested wait before the next attempt, if the response carried one
    fn retry_after(&self) -> Option<Duration>;

    /// Error reported once every attempt was rate limited
    fn exhausted(attempts: u32) -> Self;
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub min_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Policy without sleeping, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            min_delay: Duration::ZERO,
        }
    }

    /// Wait before retrying after the given zero-based attempt
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let delay = hint.unwrap_or(self.base_delay * (attempt + 1));
        delay.max(self.min_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-rate-limit error, or the
    /// attempt budget is spent.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: RateLimited + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        for attempt in 0..self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_rate_limited() => {
                    if attempt + 1 == self.max_attempts {
                        break;
                    }
                    let delay = self.delay_for(attempt, err.retry_after());
                    warn!(
                        call = label,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(E::exhausted(self.max_attempts))
    }
}

/// Extracts a wait hint such as `try again in 1.5s` or `try again in 250ms`
/// from a rate-limit error message.
pub fn parse_retry_hint(message: &str) -> Option<Duration> {
    static HINT_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = HINT_REGEX.get_or_init(|| {
        Regex::new(r"(?i)try again in (\d+(?:\.\d+)?)\s*(ms|s)\b").expect("valid regex")
    });
    let caps = re.captures(message)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let millis = match caps.get(2)?.as_str().to_ascii_lowercase().as_str() {
        "s" => amount * 1000.0,
        _ => amount,
    };
    Some(Duration::from_millis(millis.round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Limited(Option<Duration>),
        Fatal,
        Exhausted(u32),
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl RateLimited for TestError {
        fn is_rate_limited(&self) -> bool {
            matches!(self, TestError::Limited(_))
        }

        fn retry_after(&self) -> Option<Duration> {
            match self {
                TestError::Limited(hint) => *hint,
                _ => None,
            }
        }

        fn exhausted(attempts: u32) -> Self {
            TestError::Exhausted(attempts)
        }
    }

    #[test]
    fn test_parse_retry_hint_seconds() {
        assert_eq!(
            parse_retry_hint("Rate limit reached. Please try again in 1.5s."),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_parse_retry_hint_millis() {
        assert_eq!(
            parse_retry_hint("please Try again in 250ms"),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_parse_retry_hint_absent() {
        assert_eq!(parse_retry_hint("Rate limit reached"), None);
    }

    #[test]
    fn test_delay_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0, None), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(3000));
    }

    #[test]
    fn test_delay_hint_has_floor() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(0, Some(Duration::from_millis(5))),
            Duration::from_millis(200)
        );
        assert_eq!(
            policy.delay_for(0, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
    }

    #[tokio::test]
    async fn test_run_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<u32, TestError> = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError::Limited(None))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<(), TestError> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Limited(Some(Duration::ZERO))) }
            })
            .await;

        assert!(matches!(result, Err(TestError::Exhausted(3))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_other_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<(), TestError> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Fatal) }
            })
            .await;

        assert!(matches!(result, Err(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
