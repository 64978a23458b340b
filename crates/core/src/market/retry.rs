use crate::market::error::FetchExhaustedError;
use std::future::Future;
use std::time::Duration;

/// Run `op` up to `max_attempts` times with exponential backoff (1s, 2s, 4s,
/// ...). Attempts are strictly sequential; a failed attempt's output is
/// discarded, never merged. Exhaustion is returned as a
/// [`FetchExhaustedError`] value rather than bubbling the last raw error.
pub async fn with_backoff<T, F, Fut>(
    what: &'static str,
    max_attempts: u32,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts {
                    return Err(FetchExhaustedError {
                        what,
                        attempts: attempt,
                        detail: format!("{err:#}"),
                    }
                    .into());
                }
                let backoff = Duration::from_secs(1 << (attempt - 1));
                tracing::warn!(what, attempt, ?backoff, error = %err, "fetch failed; retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
