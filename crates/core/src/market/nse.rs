use crate::config::Settings;
use crate::market::retry;
use crate::market::types::{
    DividendAnnouncement, DividendsResponse, Instrument, MarketDataResponse,
};
use crate::market::MarketDataClient;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, AUTHORIZATION};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const STOCKS_PATH: &str = "/market-data/stocks";
const DIVIDENDS_PATH: &str = "/dividends/recent";
const DIVIDEND_WINDOW_DAYS: u32 = 30;

/// Client for the NSE market-data endpoint. The reqwest timeout bounds each
/// attempt independently; an attempt past its deadline is cancelled, not left
/// to hang.
#[derive(Debug, Clone)]
pub struct HttpMarketDataClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry_attempts: u32,
}

impl HttpMarketDataClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_nse_api_base_url()?.to_string();
        let api_key = settings.require_nse_api_key()?.to_string();

        let timeout_secs = std::env::var("NSE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retry_attempts = std::env::var("NSE_API_RETRY_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRY_ATTEMPTS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            retry_attempts,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.api_key);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer)?);
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        Ok(headers)
    }

    async fn fetch_stocks_once(&self) -> Result<Vec<Instrument>> {
        let res = self
            .http
            .get(self.url(STOCKS_PATH))
            .headers(self.headers()?)
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<MarketDataResponse>(&text)
            .with_context(|| format!("market data response is not valid JSON: {text}"))?;
        Ok(parsed.stocks)
    }

    async fn fetch_dividends_once(&self) -> Result<Vec<DividendAnnouncement>> {
        let res = self
            .http
            .get(self.url(DIVIDENDS_PATH))
            .headers(self.headers()?)
            .query(&[("days", DIVIDEND_WINDOW_DAYS)])
            .send()
            .await
            .context("dividend request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read dividend response")?;
        if !status.is_success() {
            anyhow::bail!("dividend HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<DividendsResponse>(&text)
            .with_context(|| format!("dividend response is not valid JSON: {text}"))?;
        Ok(parsed.dividends)
    }
}

#[async_trait::async_trait]
impl MarketDataClient for HttpMarketDataClient {
    fn provider_name(&self) -> &'static str {
        "nse_http_json"
    }

    async fn fetch_stocks(&self) -> Result<Vec<Instrument>> {
        let stocks = retry::with_backoff("market data", self.retry_attempts, || {
            self.fetch_stocks_once()
        })
        .await?;
        tracing::info!(stocks = stocks.len(), "fetched market data");
        Ok(stocks)
    }

    async fn fetch_recent_dividends(&self) -> Vec<DividendAnnouncement> {
        // Dividend data is an enrichment signal, not essential: one attempt,
        // and any failure leaves the ranking momentum-only.
        match self.fetch_dividends_once().await {
            Ok(dividends) => {
                tracing::info!(dividends = dividends.len(), "fetched recent dividends");
                dividends
            }
            Err(err) => {
                tracing::warn!(error = %err, "dividend fetch failed; continuing without dividend signal");
                Vec::new()
            }
        }
    }
}
