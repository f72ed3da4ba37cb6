use anyhow::{bail, Context};
use serde::Deserialize;
use std::{fs, time::Duration};

pub const DEFAULT_PROVIDER_URL: &str = "https://web-api.tp.entsoe.eu/api";

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    /// Per-request timeout. Unset leaves the transport defaults in place.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_provider_url(),
            request_timeout_secs: None,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_market_areas")]
    pub market_areas: Vec<String>,
    #[serde(default = "default_lookback_window_hours")]
    pub lookback_window_hours: u32,
    /// How far behind "now" the window ends; provider data settles with a delay.
    #[serde(default = "default_end_lag_hours")]
    pub end_lag_hours: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            market_areas: default_market_areas(),
            lookback_window_hours: default_lookback_window_hours(),
            end_lag_hours: default_end_lag_hours(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_country")]
    pub default_country: String,
    #[serde(default = "default_api_limit")]
    pub limit: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_api_bind_addr(),
            default_country: default_country(),
            limit: default_api_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("INGESTION_CONFIG").unwrap_or_else(|_| "ingestion-config.toml".to_string());
        let contents =
            fs::read_to_string(&path).with_context(|| format!("failed to read config file {path}"))?;
        let mut cfg = Self::from_toml(&contents).with_context(|| format!("invalid config file {path}"))?;

        // Secrets are usually injected by the environment rather than committed to the file.
        if let Ok(key) = env::var("ENTSOE_API_KEY") {
            cfg.provider.api_key = key;
        }
        if let Ok(uri) = env::var("DATABASE_URL") {
            cfg.database.uri = uri;
        }

        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    /// Checks needed before running the ingestion job.
    pub fn validate_ingestion(&self) -> anyhow::Result<()> {
        if self.provider.api_key.trim().is_empty() {
            bail!("provider.api_key is empty (set it in the config file or ENTSOE_API_KEY)");
        }
        self.validate_database()?;
        if self.ingestion.market_areas.is_empty() {
            bail!("ingestion.market_areas must list at least one market area");
        }
        if self.ingestion.lookback_window_hours == 0 {
            bail!("ingestion.lookback_window_hours must be positive");
        }
        if self.ingestion.batch_size == 0 {
            bail!("ingestion.batch_size must be positive");
        }
        Ok(())
    }

    /// Checks needed before serving the read API.
    pub fn validate_api(&self) -> anyhow::Result<()> {
        self.validate_database()?;
        if self.api.limit <= 0 {
            bail!("api.limit must be positive");
        }
        Ok(())
    }

    fn validate_database(&self) -> anyhow::Result<()> {
        if self.database.uri.trim().is_empty() {
            bail!("database.uri is empty (set it in the config file or DATABASE_URL)");
        }
        Ok(())
    }
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_max_connections() -> u32 {
    4
}

fn default_market_areas() -> Vec<String> {
    ["DE", "FR", "ES", "GB"].iter().map(|s| s.to_string()).collect()
}

fn default_lookback_window_hours() -> u32 {
    24
}

fn default_end_lag_hours() -> u32 {
    72
}

fn default_batch_size() -> usize {
    1000
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_country() -> String {
    "DE".to_string()
}

fn default_api_limit() -> i64 {
    100
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
