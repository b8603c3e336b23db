//! Bounded retry with exponential backoff for listing and download requests.

mod classify;
mod policy;

pub use classify::{classify, classify_curl_error, classify_http_status, TransferError};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};

/// Runs a request closure until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
/// Blocks the calling thread; run from a worker thread, not the async loop.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, TransferError>
where
    F: FnMut() -> Result<T, TransferError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) => {
                let kind = classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(delay) => {
                        tracing::debug!(attempt, "retrying after {:?}: {}", delay, e);
                        std::thread::sleep(delay);
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn returns_value_on_first_success() {
        let out = run_with_retry(&fast_policy(3), || Ok::<_, TransferError>(7u32));
        assert_eq!(out.unwrap(), 7);
    }

    #[test]
    fn retries_retryable_errors_until_success() {
        let mut calls = 0u32;
        let out = run_with_retry(&fast_policy(5), || {
            calls += 1;
            if calls < 3 {
                Err(TransferError::Http(503))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(out.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0u32;
        let out: Result<(), _> = run_with_retry(&fast_policy(3), || {
            calls += 1;
            Err(TransferError::Http(500))
        });
        assert!(out.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn does_not_retry_non_retryable_errors() {
        let mut calls = 0u32;
        let out: Result<(), _> = run_with_retry(&fast_policy(5), || {
            calls += 1;
            Err(TransferError::Http(404))
        });
        assert!(matches!(out, Err(TransferError::Http(404))));
        assert_eq!(calls, 1);
    }
}
