use crate::config::Config;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

/// Warehouse connection settings, read from the environment.
///
/// Two sources are supported: discrete `TIMESCALEDB_*` credentials and a
/// single `DATABASE_URL` connection string. [`connect`] tries them in that
/// order.
#[derive(Debug, Clone)]
pub struct DbSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub statement_timeout_secs: u64,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DbSettings {
    /// Read warehouse settings from the environment.
    ///
    /// - `TIMESCALEDB_HOST`, `TIMESCALEDB_PORT`, `TIMESCALEDB_DATABASE`
    ///   (falling back to `TIMESCALEDB_NAME`), `TIMESCALEDB_USER`,
    ///   `TIMESCALEDB_PASSWORD` — discrete credentials. Values wrapped in
    ///   quotes (as some deploy tooling emits) are unquoted before use.
    /// - `DATABASE_URL` — connection string.
    pub fn from_env(config: &Config) -> Self {
        Self {
            host: env_unquoted("TIMESCALEDB_HOST"),
            port: env_unquoted("TIMESCALEDB_PORT").and_then(|p| p.parse().ok()),
            database: env_unquoted("TIMESCALEDB_DATABASE")
                .or_else(|| env_unquoted("TIMESCALEDB_NAME")),
            user: env_unquoted("TIMESCALEDB_USER"),
            password: env_unquoted("TIMESCALEDB_PASSWORD"),
            url: env_unquoted("DATABASE_URL"),
            statement_timeout_secs: config.statement_timeout_secs,
            max_connections: config.max_connections,
            acquire_timeout_secs: config.acquire_timeout_secs,
        }
    }

    /// Connect options from the discrete credentials, or `None` if they are
    /// not fully configured. The port defaults to 5432 when unset.
    fn discrete_options(&self) -> Option<PgConnectOptions> {
        let host = self.host.as_deref()?;
        let database = self.database.as_deref()?;
        let user = self.user.as_deref()?;
        let password = self.password.as_deref()?;
        let mut options = PgConnectOptions::new()
            .host(host)
            .database(database)
            .username(user)
            .password(password);
        if let Some(port) = self.port {
            options = options.port(port);
        }
        Some(options)
    }

    /// First few characters of the configured host, for diagnostics.
    /// Never exposes the full value.
    pub fn host_preview(&self) -> Option<String> {
        self.host.as_ref().map(|h| {
            if h.chars().count() <= 8 {
                h.clone()
            } else {
                let prefix: String = h.chars().take(8).collect();
                format!("{prefix}...")
            }
        })
    }
}

/// Read an environment variable, stripping one matching pair of surrounding
/// quotes.
fn env_unquoted(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| unquote(&v).to_string())
}

fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// Errors from exhausting every connection source.
#[derive(Debug)]
pub enum ConnectError {
    /// Both the discrete credentials and the connection string failed.
    /// Carries both causes so operators can see which source broke and how.
    Exhausted { discrete: String, url: String },
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted { discrete, url } => write!(
                f,
                "all connection sources failed; discrete credentials: {discrete}; connection string: {url}"
            ),
        }
    }
}

impl std::error::Error for ConnectError {}

/// Build the warehouse pool, probing each configuration source with a live
/// `SELECT 1` before accepting it.
///
/// Source order: discrete `TIMESCALEDB_*` credentials, then `DATABASE_URL`.
/// The returned pool is the process-wide handle; callers thread it through
/// `AppState` rather than re-connecting. There is no retry here — a caller
/// that sees `ConnectError` should treat the store as unreachable until
/// restart.
pub async fn connect(settings: &DbSettings) -> Result<PgPool, ConnectError> {
    let discrete = match settings.discrete_options() {
        Some(options) => match try_source(settings, options).await {
            Ok(pool) => {
                tracing::info!(source = "discrete", "Connected to analytics store");
                return Ok(pool);
            }
            Err(e) => {
                tracing::warn!(source = "discrete", error = %e, "Connection source failed");
                e.to_string()
            }
        },
        None => "TIMESCALEDB_* credentials are not fully configured".to_string(),
    };

    let url = match settings.url.as_deref() {
        Some(raw) => match raw.parse::<PgConnectOptions>() {
            Ok(options) => match try_source(settings, options).await {
                Ok(pool) => {
                    tracing::info!(source = "url", "Connected to analytics store");
                    return Ok(pool);
                }
                Err(e) => {
                    tracing::warn!(source = "url", error = %e, "Connection source failed");
                    e.to_string()
                }
            },
            Err(e) => format!("invalid DATABASE_URL: {e}"),
        },
        None => "DATABASE_URL is not set".to_string(),
    };

    Err(ConnectError::Exhausted { discrete, url })
}

/// Build a pool for one set of connect options and probe it.
async fn try_source(
    settings: &DbSettings,
    options: PgConnectOptions,
) -> Result<PgPool, sqlx::Error> {
    // statement_timeout is a session option, so the store itself bounds every
    // query this pool ever runs.
    let options = options.options([(
        "statement_timeout",
        format!("{}s", settings.statement_timeout_secs),
    )]);

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect_with(options)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_settings() -> DbSettings {
        DbSettings {
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
            url: None,
            statement_timeout_secs: 30,
            max_connections: 2,
            acquire_timeout_secs: 1,
        }
    }

    #[test]
    fn test_unquote_double_quotes() {
        assert_eq!(unquote("\"secret\""), "secret");
    }

    #[test]
    fn test_unquote_single_quotes() {
        assert_eq!(unquote("'secret'"), "secret");
    }

    #[test]
    fn test_unquote_plain_value() {
        assert_eq!(unquote("secret"), "secret");
    }

    #[test]
    fn test_unquote_mismatched_quotes_left_alone() {
        assert_eq!(unquote("\"secret'"), "\"secret'");
    }

    #[test]
    fn test_unquote_trims_whitespace() {
        assert_eq!(unquote("  \"secret\"  "), "secret");
    }

    #[test]
    fn test_discrete_options_incomplete() {
        let mut settings = bare_settings();
        settings.host = Some("db.example.com".to_string());
        settings.user = Some("reporter".to_string());
        // database and password missing
        assert!(settings.discrete_options().is_none());
    }

    #[test]
    fn test_discrete_options_complete() {
        let mut settings = bare_settings();
        settings.host = Some("db.example.com".to_string());
        settings.port = Some(5433);
        settings.database = Some("analytics".to_string());
        settings.user = Some("reporter".to_string());
        settings.password = Some("hunter2".to_string());
        assert!(settings.discrete_options().is_some());
    }

    #[test]
    fn test_host_preview_truncates() {
        let mut settings = bare_settings();
        settings.host = Some("warehouse.internal.example.com".to_string());
        assert_eq!(settings.host_preview().as_deref(), Some("warehous..."));
    }

    #[test]
    fn test_host_preview_short_host() {
        let mut settings = bare_settings();
        settings.host = Some("db".to_string());
        assert_eq!(settings.host_preview().as_deref(), Some("db"));
    }

    #[test]
    fn test_host_preview_unset() {
        assert!(bare_settings().host_preview().is_none());
    }

    #[tokio::test]
    async fn test_connect_reports_both_causes() {
        // Neither source configured: the error must reference both.
        let err = connect(&bare_settings()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("TIMESCALEDB_* credentials are not fully configured"));
        assert!(msg.contains("DATABASE_URL is not set"));
    }

    #[tokio::test]
    async fn test_connect_invalid_url_cause() {
        let mut settings = bare_settings();
        settings.url = Some("not a postgres url".to_string());
        let err = connect(&settings).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("invalid DATABASE_URL"));
        assert!(msg.contains("TIMESCALEDB_* credentials are not fully configured"));
    }
}
