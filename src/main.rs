use pulseboard::config::Config;
use pulseboard::db::{self, DbSettings};
use pulseboard::server::{self, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulseboard=info,tower_http=info".into()),
        )
        .init();

    // DATABASE_URL / TIMESCALEDB_* may live in a .env file during development
    dotenvy::dotenv().ok();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        comparison_lag_days = config.comparison_lag_days,
        "Starting Pulseboard"
    );

    // Connect the warehouse pool once; a startup that cannot reach the store
    // through either configuration source is terminal.
    let settings = DbSettings::from_env(&config);
    let pool = db::connect(&settings)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to the analytics store: {e}"));

    let state = Arc::new(AppState {
        pool,
        db_settings: settings,
        comparison_lag_days: config.comparison_lag_days,
        dashboard_origin: config.dashboard_origin.clone(),
    });

    let app = server::build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await.expect("Server error");
}
