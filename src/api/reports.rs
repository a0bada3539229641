use crate::api::errors::ApiError;
use crate::api::params::{RangeParams, SkuParams};
use crate::reports::{demographics, funnel, kpis, regions, sales, sku, traffic, with_fallback};
use crate::server::AppState;
use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;

/// GET /api/kpis — Headline KPI figures with week-over-week change.
pub async fn get_kpis(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<kpis::KpiReport>, ApiError> {
    let range = params.date_range()?;
    let report = with_fallback(
        "kpis",
        kpis::live(&state.pool, range, state.comparison_lag_days),
        kpis::fallback(),
    )
    .await;
    Ok(Json(report))
}

/// GET /api/traffic — Weekday visit series plus device/source breakdowns.
pub async fn get_traffic(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<traffic::TrafficReport>, ApiError> {
    let range = params.date_range()?;
    let report = with_fallback(
        "traffic",
        traffic::live(&state.pool, range, state.comparison_lag_days),
        traffic::fallback(),
    )
    .await;
    Ok(Json(report))
}

/// GET /api/sales — Weekday revenue/units series with totals.
pub async fn get_sales(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<sales::SalesReport>, ApiError> {
    let range = params.date_range()?;
    let report = with_fallback(
        "sales",
        sales::live(&state.pool, range, state.comparison_lag_days),
        sales::fallback(),
    )
    .await;
    Ok(Json(report))
}

/// GET /api/regions — Per-region revenue with week-over-week change.
pub async fn get_regions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<regions::RegionSales>>, ApiError> {
    let range = params.date_range()?;
    let report = with_fallback(
        "regions",
        regions::live(&state.pool, range, state.comparison_lag_days),
        regions::fallback(),
    )
    .await;
    Ok(Json(report))
}

/// GET /api/demographics — Age/gender rollups and new-vs-returning counts.
pub async fn get_demographics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<demographics::DemographicsReport>, ApiError> {
    let range = params.date_range()?;
    let report = with_fallback(
        "demographics",
        demographics::live(&state.pool, range),
        demographics::fallback(),
    )
    .await;
    Ok(Json(report))
}

/// GET /api/funnel — Dense five-stage funnel with conversion percentages.
pub async fn get_funnel(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<funnel::FunnelStage>>, ApiError> {
    let range = params.date_range()?;
    let report = with_fallback(
        "funnel",
        funnel::live(&state.pool, range, state.comparison_lag_days),
        funnel::fallback(),
    )
    .await;
    Ok(Json(report))
}

/// GET /api/sku-data — Interaction detail for one SKU.
/// `skuId` defaults to `ID140001` when omitted.
pub async fn get_sku_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SkuParams>,
) -> Result<Json<sku::SkuReport>, ApiError> {
    let range = params.date_range()?;
    let report = with_fallback(
        "sku-data",
        sku::live(
            &state.pool,
            &params.sku_id,
            range,
            state.comparison_lag_days,
        ),
        sku::fallback(&params.sku_id),
    )
    .await;
    Ok(Json(report))
}
