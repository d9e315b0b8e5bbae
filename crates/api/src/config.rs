//! Application configuration loaded from environment variables.

use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;

/// Logistics server configuration.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3010`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL connection string; in-memory store when unset
/// - `CATALOG_URL` — product catalog base URL; built-in catalog when unset
/// - `PURCHASING_URL` — where cancellation notices go; logged only when unset
/// - `UPSTREAM_TIMEOUT_SECS` — timeout for outgoing calls (default: `15`)
/// - `REFERENCE_DATA_PATH` — JSON file with localities and centers
#[derive(Debug, Clone)]
pub struct LogisticsConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub catalog_url: Option<String>,
    pub purchasing_url: Option<String>,
    pub upstream_timeout: Duration,
    pub reference_data_path: Option<String>,
}

impl LogisticsConfig {
    pub const DEFAULT_PORT: u16 = 3010;

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: non_empty(&lookup, "DATABASE_URL"),
            catalog_url: non_empty(&lookup, "CATALOG_URL"),
            purchasing_url: non_empty(&lookup, "PURCHASING_URL"),
            upstream_timeout: upstream_timeout(&lookup),
            reference_data_path: non_empty(&lookup, "REFERENCE_DATA_PATH"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for LogisticsConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            database_url: None,
            catalog_url: None,
            purchasing_url: None,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            reference_data_path: None,
        }
    }
}

/// Purchasing server configuration.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `STOCK_URL` — stock service base URL (default: `http://localhost:8000`)
/// - `LOGISTICS_URL` — logistics service base URL (default: `http://localhost:3010`)
/// - `UPSTREAM_TIMEOUT_SECS` — per-call timeout for the checkout saga (default: `15`)
#[derive(Debug, Clone)]
pub struct PurchasingConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub stock_url: String,
    pub logistics_url: String,
    pub upstream_timeout: Duration,
}

impl PurchasingConfig {
    pub const DEFAULT_PORT: u16 = 3000;

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            stock_url: non_empty(&lookup, "STOCK_URL").unwrap_or(defaults.stock_url),
            logistics_url: non_empty(&lookup, "LOGISTICS_URL").unwrap_or(defaults.logistics_url),
            upstream_timeout: upstream_timeout(&lookup),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for PurchasingConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            stock_url: "http://localhost:8000".to_string(),
            logistics_url: format!("http://localhost:{}", LogisticsConfig::DEFAULT_PORT),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn upstream_timeout(lookup: &impl Fn(&str) -> Option<String>) -> Duration {
    parsed::<u64>(lookup, "UPSTREAM_TIMEOUT_SECS")
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS))
}
