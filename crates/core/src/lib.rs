pub mod cache;
pub mod domain;
pub mod market;
pub mod pipeline;
pub mod scoring;
pub mod time;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub nse_api_base_url: Option<String>,
        pub nse_api_key: Option<String>,
        pub redis_url: Option<String>,
        pub redis_password: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                nse_api_base_url: std::env::var("NSE_API_BASE_URL").ok(),
                nse_api_key: std::env::var("NSE_API_KEY").ok(),
                redis_url: std::env::var("REDIS_URL").ok(),
                redis_password: std::env::var("REDIS_PASSWORD").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_nse_api_base_url(&self) -> anyhow::Result<&str> {
            self.nse_api_base_url
                .as_deref()
                .context("NSE_API_BASE_URL is required")
        }

        pub fn require_nse_api_key(&self) -> anyhow::Result<&str> {
            self.nse_api_key
                .as_deref()
                .context("NSE_API_KEY is required")
        }

        pub fn require_redis_url(&self) -> anyhow::Result<&str> {
            self.redis_url.as_deref().context("REDIS_URL is required")
        }
    }
}
