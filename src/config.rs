use serde::Deserialize;
use std::path::Path;

/// Application configuration loaded from environment variables or TOML file.
///
/// Warehouse credentials are deliberately not part of this struct: they come
/// from `TIMESCALEDB_*` / `DATABASE_URL` and are read by
/// [`crate::db::DbSettings::from_env`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How far back the comparison window sits behind the requested range,
    /// in days. Every week-over-week change figure uses this lag.
    #[serde(default = "default_comparison_lag_days")]
    pub comparison_lag_days: i64,
    /// Per-session statement timeout applied to every warehouse query, in
    /// seconds. Enforced by Postgres, not by this process.
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
    /// Maximum number of pooled warehouse connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long to wait for a pooled connection before giving up, in seconds.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Dashboard origin for CORS restrictions on the report routes.
    /// If not set, report routes allow any origin.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_comparison_lag_days() -> i64 {
    7
}

const fn default_statement_timeout_secs() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            comparison_lag_days: default_comparison_lag_days(),
            statement_timeout_secs: default_statement_timeout_secs(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            dashboard_origin: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `PULSEBOARD_HOST` → host
    /// - `PULSEBOARD_PORT` → port
    /// - `PULSEBOARD_COMPARISON_LAG_DAYS` → comparison_lag_days
    /// - `PULSEBOARD_STATEMENT_TIMEOUT` → statement_timeout_secs
    /// - `PULSEBOARD_MAX_CONNECTIONS` → max_connections
    /// - `PULSEBOARD_ACQUIRE_TIMEOUT` → acquire_timeout_secs
    /// - `PULSEBOARD_DASHBOARD_ORIGIN` → dashboard_origin
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        // Environment variable overrides
        if let Ok(host) = std::env::var("PULSEBOARD_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PULSEBOARD_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(lag) = std::env::var("PULSEBOARD_COMPARISON_LAG_DAYS") {
            if let Ok(l) = lag.parse() {
                config.comparison_lag_days = l;
            }
        }
        if let Ok(timeout) = std::env::var("PULSEBOARD_STATEMENT_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                config.statement_timeout_secs = t;
            }
        }
        if let Ok(max) = std::env::var("PULSEBOARD_MAX_CONNECTIONS") {
            if let Ok(m) = max.parse() {
                config.max_connections = m;
            }
        }
        if let Ok(timeout) = std::env::var("PULSEBOARD_ACQUIRE_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                config.acquire_timeout_secs = t;
            }
        }
        if let Ok(origin) = std::env::var("PULSEBOARD_DASHBOARD_ORIGIN") {
            config.dashboard_origin = Some(origin);
        }

        config
    }
}
