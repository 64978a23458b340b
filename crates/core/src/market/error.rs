use std::fmt;

/// Terminal fetch failure: every attempt in the retry budget failed. Carried
/// through `anyhow` and recovered with `downcast_ref` where the boundary
/// needs to distinguish upstream exhaustion from other failures.
#[derive(Debug, Clone)]
pub struct FetchExhaustedError {
    pub what: &'static str,
    pub attempts: u32,
    pub detail: String,
}

impl fmt::Display for FetchExhaustedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to fetch {} after {} attempts: {}",
            self.what, self.attempts, self.detail
        )
    }
}

impl std::error::Error for FetchExhaustedError {}
