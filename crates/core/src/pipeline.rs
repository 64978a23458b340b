use crate::cache::{self, InsightsCache};
use crate::domain::insights::{DailyInsights, MarketSummary};
use crate::market::types::Instrument;
use crate::market::MarketDataClient;
use crate::scoring;
use crate::time::nse_market;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const DEFAULT_TOP_N: usize = 3;

/// Cache-aside orchestrator: cache lookup, on miss fetch + score, write back,
/// return. Concurrent invocations for the same key are not coalesced; both
/// recompute and the later write wins inside the TTL window.
pub struct InsightsPipeline {
    cache: Arc<dyn InsightsCache>,
    market: Arc<dyn MarketDataClient>,
    namespace: String,
    top_n: usize,
    write_back: bool,
}

impl InsightsPipeline {
    pub fn new(cache: Arc<dyn InsightsCache>, market: Arc<dyn MarketDataClient>) -> Self {
        Self {
            cache,
            market,
            namespace: cache::DEFAULT_NAMESPACE.to_string(),
            top_n: DEFAULT_TOP_N,
            write_back: true,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Disable write-back: compute and return without touching the stored
    /// entry.
    pub fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }

    /// Cache key for the trading day containing `now`.
    pub fn cache_key_for(&self, now: DateTime<Utc>) -> Result<String> {
        let date = nse_market::today(now)?;
        Ok(cache::cache_key(&self.namespace, date))
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<DailyInsights> {
        let date = nse_market::today(now)?;
        let key = cache::cache_key(&self.namespace, date);

        match self.cache.get(&key).await {
            Ok(Some(mut cached)) => {
                tracing::info!(%key, "cache hit; serving stored insights");
                cached.cache_hit = true;
                return Ok(cached);
            }
            Ok(None) => tracing::info!(%key, "cache miss; fetching market data"),
            // An unreachable cache reads as a miss; the pipeline stays
            // read-available.
            Err(err) => tracing::warn!(%key, error = %err, "cache read failed; treating as miss"),
        }

        // Quotes and dividends are independent; scoring waits on both.
        let (stocks, dividends) = tokio::join!(
            self.market.fetch_stocks(),
            self.market.fetch_recent_dividends()
        );
        let stocks = stocks?;

        let picks = scoring::rank(&stocks, &dividends, self.top_n, date);
        let insights = DailyInsights {
            date,
            market_summary: market_summary(&stocks),
            picks,
            cache_hit: false,
            data_freshness_minutes: 0,
        };

        if self.write_back {
            if let Err(err) = self.cache.set(&key, &insights, None).await {
                tracing::warn!(%key, error = %err, "cache write failed; returning uncached result");
            }
        }

        Ok(insights)
    }
}

pub fn market_summary(stocks: &[Instrument]) -> MarketSummary {
    let advancers = stocks
        .iter()
        .filter(|s| s.current_price > s.previous_close)
        .count() as u32;
    let decliners = stocks
        .iter()
        .filter(|s| s.current_price < s.previous_close)
        .count() as u32;

    MarketSummary {
        total_volume: stocks.iter().map(|s| s.volume).sum(),
        advancers,
        decliners,
        unchanged: stocks.len() as u32 - advancers - decliners,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::error::FetchExhaustedError;
    use crate::market::types::DividendAnnouncement;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    // 10:00 in Nairobi on 2026-08-07.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 7, 0, 0).unwrap()
    }

    fn stock(ticker: &str, volume: u64) -> Instrument {
        Instrument {
            ticker: ticker.to_string(),
            name: format!("{ticker} PLC"),
            current_price: 25.5,
            previous_close: 22.0,
            volume,
            average_volume: 1_000_000,
            market_cap: 2.0e11,
            dividend_yield: Some(5.8),
            high_52_week: 28.0,
            low_52_week: 18.5,
            moving_average_20_day: 25.0,
        }
    }

    /// Serializing store over a plain map, so pipeline tests also exercise
    /// the JSON round trip the real store performs.
    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<String, String>>,
        fail_writes: bool,
        fail_reads: bool,
    }

    #[async_trait::async_trait]
    impl InsightsCache for MemoryCache {
        async fn get(&self, key: &str) -> Result<Option<DailyInsights>> {
            if self.fail_reads {
                anyhow::bail!("cache down");
            }
            let entries = self.entries.lock().await;
            match entries.get(key) {
                Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
                None => Ok(None),
            }
        }

        async fn set(
            &self,
            key: &str,
            value: &DailyInsights,
            _ttl_seconds: Option<u64>,
        ) -> Result<()> {
            if self.fail_writes {
                anyhow::bail!("cache down");
            }
            let payload = serde_json::to_string(value)?;
            self.entries.lock().await.insert(key.to_string(), payload);
            Ok(())
        }

        async fn exists(&self, key: &str) -> Result<bool> {
            Ok(self.entries.lock().await.contains_key(key))
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubMarket {
        stocks: Vec<Instrument>,
        dividends: Vec<DividendAnnouncement>,
        fail_stocks: bool,
        stock_calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl MarketDataClient for StubMarket {
        fn provider_name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_stocks(&self) -> Result<Vec<Instrument>> {
            self.stock_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_stocks {
                return Err(FetchExhaustedError {
                    what: "market data",
                    attempts: 3,
                    detail: "upstream down".to_string(),
                }
                .into());
            }
            Ok(self.stocks.clone())
        }

        async fn fetch_recent_dividends(&self) -> Vec<DividendAnnouncement> {
            self.dividends.clone()
        }
    }

    fn pipeline(cache: Arc<MemoryCache>, market: Arc<StubMarket>) -> InsightsPipeline {
        InsightsPipeline::new(cache, market).with_namespace("testns")
    }

    #[tokio::test]
    async fn miss_fetches_scores_persists_then_hits() {
        let cache = Arc::new(MemoryCache::default());
        let market = Arc::new(StubMarket {
            stocks: vec![stock("SCOM", 1_200_000), stock("EABL", 2_000_000)],
            dividends: vec![DividendAnnouncement {
                ticker: "SCOM".to_string(),
                announcement_date: NaiveDate::from_ymd_opt(2026, 7, 30).unwrap(),
                ex_dividend_date: NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
                dividend_per_share: 1.2,
                yield_percent: 5.8,
            }],
            ..Default::default()
        });
        let pipeline = pipeline(cache.clone(), market.clone());

        let fresh = pipeline.run(now()).await.unwrap();
        assert!(!fresh.cache_hit);
        assert_eq!(fresh.data_freshness_minutes, 0);
        assert_eq!(fresh.date, NaiveDate::from_ymd_opt(2026, 8, 7).unwrap());
        assert_eq!(fresh.picks.len(), 2);
        assert_eq!(fresh.market_summary.advancers, 2);
        assert_eq!(fresh.market_summary.total_volume, 3_200_000);
        assert!(cache
            .exists(&pipeline.cache_key_for(now()).unwrap())
            .await
            .unwrap());

        // SCOM qualifies with both the momentum and dividend signals live.
        let scom = fresh.picks.iter().find(|p| p.ticker == "SCOM").unwrap();
        assert!(scom.momentum_score > 0);
        assert!(scom.dividend_score >= 50);

        let cached = pipeline.run(now()).await.unwrap();
        assert!(cached.cache_hit);
        assert_eq!(cached.picks, fresh.picks);
        assert_eq!(cached.market_summary, fresh.market_summary);
        // Second run was served from the store.
        assert_eq!(market.stock_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_exhaustion_aborts_the_run() {
        let cache = Arc::new(MemoryCache::default());
        let market = Arc::new(StubMarket {
            fail_stocks: true,
            ..Default::default()
        });
        let pipeline = pipeline(cache.clone(), market);

        let err = pipeline.run(now()).await.unwrap_err();
        let exhausted = err
            .downcast_ref::<FetchExhaustedError>()
            .expect("expected FetchExhaustedError");
        assert_eq!(exhausted.attempts, 3);
        // Nothing partial was cached.
        assert!(!cache
            .exists(&pipeline.cache_key_for(now()).unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn cache_write_failure_still_returns_the_result() {
        let cache = Arc::new(MemoryCache {
            fail_writes: true,
            ..Default::default()
        });
        let market = Arc::new(StubMarket {
            stocks: vec![stock("SCOM", 1_200_000)],
            ..Default::default()
        });

        let insights = pipeline(cache, market).run(now()).await.unwrap();
        assert!(!insights.cache_hit);
        assert_eq!(insights.picks.len(), 1);
    }

    #[tokio::test]
    async fn cache_read_failure_degrades_to_a_miss() {
        let cache = Arc::new(MemoryCache {
            fail_reads: true,
            fail_writes: true,
            ..Default::default()
        });
        let market = Arc::new(StubMarket {
            stocks: vec![stock("SCOM", 1_200_000)],
            ..Default::default()
        });
        let pipeline = pipeline(cache, market.clone());

        let insights = pipeline.run(now()).await.unwrap();
        assert!(!insights.cache_hit);
        assert_eq!(market.stock_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dry_run_skips_write_back() {
        let cache = Arc::new(MemoryCache::default());
        let market = Arc::new(StubMarket {
            stocks: vec![stock("SCOM", 1_200_000)],
            ..Default::default()
        });
        let pipeline = pipeline(cache.clone(), market).with_write_back(false);

        pipeline.run(now()).await.unwrap();
        assert!(!cache
            .exists(&pipeline.cache_key_for(now()).unwrap())
            .await
            .unwrap());
    }

    #[test]
    fn summary_counts_advancers_decliners_and_unchanged() {
        let up = stock("SCOM", 100);
        let mut down = stock("KCB", 200);
        down.current_price = 20.0;
        let mut flat = stock("EQTY", 300);
        flat.current_price = flat.previous_close;

        let summary = market_summary(&[up, down, flat]);
        assert_eq!(summary.advancers, 1);
        assert_eq!(summary.decliners, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total_volume, 600);
    }
}
