//! Bounded-retry combinator shared by the LLM transport and the judge
//! panel. Returns the result together with how many attempts it took,
//! so callers can audit retries instead of losing them.

use std::fmt::Display;
use std::future::Future;

/// Run `f` up to `max_attempts` times, retrying on any error. Yields
/// `(result, attempts, last_error)`; `result` is `None` when every
/// attempt failed.
pub async fn retry<T, E, F, Fut>(max_attempts: u32, desc: &str, mut f: F) -> (Option<T>, u32, Option<E>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut last_err = None;
    for attempt in 1..=max_attempts {
        match f().await {
            Ok(value) => return (Some(value), attempt, None),
            Err(error) => {
                tracing::warn!(
                    desc,
                    attempt,
                    max = max_attempts,
                    error = %error,
                    "retry attempt failed"
                );
                last_err = Some(error);
            }
        }
    }
    (None, max_attempts, last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_first_try() {
        let (result, attempts, error) =
            retry(3, "test", || async { Ok::<_, String>(42) }).await;
        assert_eq!(result, Some(42));
        assert_eq!(attempts, 1);
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn recovers_after_failures() {
        let calls = AtomicU32::new(0);
        let (result, attempts, _) = retry(3, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result, Some("ok"));
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn exhausts_and_reports_last_error() {
        let (result, attempts, error) = retry(3, "test", || async {
            Err::<(), _>("always down".to_string())
        })
        .await;
        assert!(result.is_none());
        assert_eq!(attempts, 3);
        assert_eq!(error.as_deref(), Some("always down"));
    }
}
