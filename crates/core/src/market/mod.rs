pub mod error;
pub mod nse;
pub mod retry;
pub mod types;

use crate::market::types::{DividendAnnouncement, Instrument};

#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Full quote list for the current session. Fails only once the retry
    /// budget is exhausted.
    async fn fetch_stocks(&self) -> anyhow::Result<Vec<Instrument>>;

    /// Dividend announcements from the last 30 days. Degrades to empty on any
    /// failure; the ranking runs without the dividend signal in that case.
    async fn fetch_recent_dividends(&self) -> Vec<DividendAnnouncement>;
}
