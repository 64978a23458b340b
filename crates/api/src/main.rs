use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dailyalpha_core::cache::store::RedisCacheStore;
use dailyalpha_core::config::Settings;
use dailyalpha_core::domain::insights::DailyInsights;
use dailyalpha_core::market::error::FetchExhaustedError;
use dailyalpha_core::market::nse::HttpMarketDataClient;
use dailyalpha_core::pipeline::InsightsPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pipeline = match build_pipeline(&settings) {
        Ok(pipeline) => Some(Arc::new(pipeline)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "pipeline config incomplete; starting API in degraded mode");
            None
        }
    };

    let state = AppState { pipeline };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/insights", get(get_insights))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_pipeline(settings: &Settings) -> anyhow::Result<InsightsPipeline> {
    let cache = Arc::new(RedisCacheStore::from_settings(settings)?);
    let market = Arc::new(HttpMarketDataClient::from_settings(settings)?);
    Ok(InsightsPipeline::new(cache, market))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pipeline: Option<Arc<InsightsPipeline>>,
}

async fn get_insights(State(state): State<AppState>) -> Result<Json<DailyInsights>, StatusCode> {
    let Some(pipeline) = &state.pipeline else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    match pipeline.run(Utc::now()).await {
        Ok(insights) => Ok(Json(insights)),
        Err(err) => {
            let status = if err.downcast_ref::<FetchExhaustedError>().is_some() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "insights pipeline failed");
            Err(status)
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
