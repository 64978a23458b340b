use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dailyalpha_core::cache::store::RedisCacheStore;
use dailyalpha_core::cache::InsightsCache;
use dailyalpha_core::market::nse::HttpMarketDataClient;
use dailyalpha_core::pipeline::InsightsPipeline;

#[derive(Debug, Parser)]
#[command(name = "dailyalpha_worker")]
struct Args {
    /// Number of picks to rank (defaults to 3).
    #[arg(long)]
    top_n: Option<usize>,

    /// Delete today's cache entry first, forcing a fresh computation.
    #[arg(long)]
    force_refresh: bool,

    /// Compute insights without writing them back to the cache.
    #[arg(long)]
    dry_run: bool,

    /// Print the resulting insights as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = dailyalpha_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let cache = Arc::new(RedisCacheStore::from_settings(&settings)?);
    let market = Arc::new(HttpMarketDataClient::from_settings(&settings)?);

    // Eager connect surfaces a dead cache up front; the run itself still
    // degrades to uncached fetches if this fails.
    if let Err(err) = cache.connect().await {
        tracing::warn!(error = %err, "redis unavailable; continuing without cache");
    }

    let mut pipeline = InsightsPipeline::new(cache.clone(), market);
    if let Some(top_n) = args.top_n {
        pipeline = pipeline.with_top_n(top_n);
    }
    if args.dry_run {
        pipeline = pipeline.with_write_back(false);
    }

    let now = chrono::Utc::now();

    if args.force_refresh {
        let key = pipeline.cache_key_for(now)?;
        if cache.exists(&key).await.unwrap_or(false) {
            cache
                .delete(&key)
                .await
                .with_context(|| format!("failed to delete cache entry {key}"))?;
            tracing::info!(%key, "deleted cached insights before refresh");
        }
    }

    match pipeline.run(now).await {
        Ok(insights) => {
            tracing::info!(
                date = %insights.date,
                cache_hit = insights.cache_hit,
                picks = insights.picks.len(),
                total_volume = insights.market_summary.total_volume,
                advancers = insights.market_summary.advancers,
                decliners = insights.market_summary.decliners,
                "daily insights ready"
            );
            for (rank, pick) in insights.picks.iter().enumerate() {
                tracing::info!(
                    rank = rank + 1,
                    ticker = %pick.ticker,
                    total_score = pick.total_score,
                    momentum_score = pick.momentum_score,
                    dividend_score = pick.dividend_score,
                    entry_point = pick.entry_point,
                    stop_loss = pick.stop_loss,
                    target_price = pick.target_price,
                    reasoning = %pick.reasoning,
                    "pick"
                );
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            }

            cache.close().await;
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "insights run failed");
            cache.close().await;
            Err(err)
        }
    }
}

fn init_sentry(settings: &dailyalpha_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
