pub mod store;

use crate::domain::insights::DailyInsights;
use chrono::NaiveDate;

pub const DEFAULT_NAMESPACE: &str = "dailyalpha";

/// One cache entry per trading-calendar day: `<namespace>:daily:<YYYY-MM-DD>`.
pub fn cache_key(namespace: &str, date: NaiveDate) -> String {
    format!("{namespace}:daily:{date}")
}

#[async_trait::async_trait]
pub trait InsightsCache: Send + Sync {
    /// A malformed stored payload reads as absent, never as an error.
    async fn get(&self, key: &str) -> anyhow::Result<Option<DailyInsights>>;

    /// `ttl_seconds: None` applies the market-hours TTL policy.
    async fn set(
        &self,
        key: &str,
        value: &DailyInsights,
        ttl_seconds: Option<u64>,
    ) -> anyhow::Result<()>;

    async fn exists(&self, key: &str) -> anyhow::Result<bool>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}
