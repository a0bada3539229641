use crate::server::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// GET /api/debug/db — Connection health probe.
///
/// Reports whether each configuration source is present (booleans only —
/// never the values) and whether a live `SELECT 1` currently succeeds. The
/// host appears truncated, for confirming which environment is wired up
/// without disclosing the full address.
pub async fn db_debug(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let probe = sqlx::query("SELECT 1").execute(&state.pool).await;
    let connected = probe.is_ok();
    let probe_error = probe.err().map(|e| e.to_string());

    let settings = &state.db_settings;
    Json(serde_json::json!({
        "connected": connected,
        "probe_error": probe_error,
        "has_host": settings.host.is_some(),
        "has_port": settings.port.is_some(),
        "has_database": settings.database.is_some(),
        "has_user": settings.user.is_some(),
        "has_password": settings.password.is_some(),
        "has_url": settings.url.is_some(),
        "host_preview": settings.host_preview(),
        "statement_timeout_secs": settings.statement_timeout_secs,
    }))
}
