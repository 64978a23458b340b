use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's ranked shortlist. This is the unit stored in the cache and served
/// to the dashboard; picks are in rank order (highest total score first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyInsights {
    pub date: NaiveDate,
    pub market_summary: MarketSummary,
    pub picks: Vec<Pick>,
    pub cache_hit: bool,
    pub data_freshness_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    pub total_volume: u64,
    pub advancers: u32,
    pub decliners: u32,
    pub unchanged: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pick {
    pub ticker: String,
    pub name: String,
    pub current_price: f64,
    pub entry_point: f64,
    pub stop_loss: f64,
    pub target_price: f64,
    pub reasoning: String,
    pub momentum_score: u32,
    pub dividend_score: u32,
    pub total_score: f64,
    pub volume_spike_percent: f64,
}
