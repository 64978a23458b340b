use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Immutable quote snapshot for a single listed equity, as served by the
/// market-data endpoint. Field names on the wire are camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub ticker: String,
    pub name: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub volume: u64,
    pub average_volume: u64,
    pub market_cap: f64,
    pub dividend_yield: Option<f64>,
    pub high_52_week: f64,
    pub low_52_week: f64,
    pub moving_average_20_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendAnnouncement {
    pub ticker: String,
    pub announcement_date: NaiveDate,
    pub ex_dividend_date: NaiveDate,
    pub dividend_per_share: f64,
    #[serde(rename = "yield")]
    pub yield_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataResponse {
    pub stocks: Vec<Instrument>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DividendsResponse {
    pub dividends: Vec<DividendAnnouncement>,
}
