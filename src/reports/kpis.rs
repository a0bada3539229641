use super::{as_f64, pct_change, rate_pct, round_avg, DateRange};
use crate::db::{self, QueryError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Headline dashboard figures for a date range, with week-over-week change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiReport {
    pub total_visits: i64,
    pub total_visits_change: i64,
    pub conversions: i64,
    pub conversions_change: i64,
    /// Bounced sessions as a whole percentage of all sessions.
    pub bounce_rate: i64,
    pub bounce_rate_change: i64,
    /// Average session duration in whole seconds.
    pub avg_duration: i64,
    pub avg_duration_change: i64,
}

/// Placeholder KPIs served when the store cannot be queried. These match
/// what the dashboard renders before any live data arrives.
pub const fn fallback() -> KpiReport {
    KpiReport {
        total_visits: 45231,
        total_visits_change: 12,
        conversions: 1205,
        conversions_change: 8,
        bounce_rate: 34,
        bounce_rate_change: -5,
        avg_duration: 245,
        avg_duration_change: 15,
    }
}

#[derive(Debug, Default, sqlx::FromRow)]
struct VisitTotalsRow {
    visits: i64,
    sessions: i64,
    bounces: i64,
    total_duration_secs: f64,
}

const VISIT_TOTALS_SQL: &str = "\
    SELECT COALESCE(SUM(visits), 0)::BIGINT AS visits,
           COALESCE(SUM(sessions), 0)::BIGINT AS sessions,
           COALESCE(SUM(bounces), 0)::BIGINT AS bounces,
           COALESCE(SUM(total_duration_secs), 0)::FLOAT8 AS total_duration_secs
    FROM visit_summaries
    WHERE bucket_ts >= $1 AND bucket_ts <= $2";

const CONVERSIONS_SQL: &str = "\
    SELECT COUNT(*)
    FROM funnel_events
    WHERE stage = 'conversion' AND occurred_at >= $1 AND occurred_at <= $2";

async fn visit_totals(
    pool: &PgPool,
    range: DateRange,
    label: &'static str,
) -> Result<VisitTotalsRow, QueryError> {
    db::fetch_one(
        label,
        sqlx::query_as::<_, VisitTotalsRow>(VISIT_TOTALS_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(pool),
    )
    .await
}

async fn conversion_count(
    pool: &PgPool,
    range: DateRange,
    label: &'static str,
) -> Result<i64, QueryError> {
    db::fetch_one(
        label,
        sqlx::query_scalar::<_, i64>(CONVERSIONS_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(pool),
    )
    .await
}

/// Query headline KPIs, comparing the requested range against the same range
/// shifted back by `lag_days`. Current and previous periods are fetched
/// concurrently.
pub async fn live(
    pool: &PgPool,
    range: DateRange,
    lag_days: i64,
) -> Result<KpiReport, QueryError> {
    let prev = range.previous(lag_days);
    let (current, previous, conversions, prev_conversions) = tokio::try_join!(
        visit_totals(pool, range, "kpi_visit_totals_current"),
        visit_totals(pool, prev, "kpi_visit_totals_previous"),
        conversion_count(pool, range, "kpi_conversions_current"),
        conversion_count(pool, prev, "kpi_conversions_previous"),
    )?;

    Ok(shape(&current, &previous, conversions, prev_conversions))
}

/// Derive the report from raw period totals. A period with no rows produces
/// zeros here — the fallback constant is reserved for query failure.
fn shape(
    current: &VisitTotalsRow,
    previous: &VisitTotalsRow,
    conversions: i64,
    prev_conversions: i64,
) -> KpiReport {
    let bounce_rate = rate_pct(as_f64(current.bounces), as_f64(current.sessions));
    let prev_bounce_rate = rate_pct(as_f64(previous.bounces), as_f64(previous.sessions));
    let avg_duration = round_avg(current.total_duration_secs, as_f64(current.sessions));
    let prev_avg_duration = round_avg(previous.total_duration_secs, as_f64(previous.sessions));

    KpiReport {
        total_visits: current.visits,
        total_visits_change: pct_change(as_f64(current.visits), as_f64(previous.visits)),
        conversions,
        conversions_change: pct_change(as_f64(conversions), as_f64(prev_conversions)),
        bounce_rate,
        bounce_rate_change: pct_change(as_f64(bounce_rate), as_f64(prev_bounce_rate)),
        avg_duration,
        avg_duration_change: pct_change(as_f64(avg_duration), as_f64(prev_avg_duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_empty_periods_compute_zeros_not_fallback() {
        // A successful query over an empty range yields all-zero totals; the
        // fallback constant is only for failed queries.
        let report = shape(
            &VisitTotalsRow::default(),
            &VisitTotalsRow::default(),
            0,
            0,
        );
        assert_eq!(report.total_visits, 0);
        assert_eq!(report.total_visits_change, 0);
        assert_eq!(report.conversions, 0);
        assert_eq!(report.bounce_rate, 0);
        assert_eq!(report.avg_duration, 0);
        assert_ne!(report, fallback());
    }

    #[test]
    fn test_shape_derives_rates_and_changes() {
        let current = VisitTotalsRow {
            visits: 1200,
            sessions: 1000,
            bounces: 340,
            total_duration_secs: 245_000.0,
        };
        let previous = VisitTotalsRow {
            visits: 1000,
            sessions: 800,
            bounces: 400,
            total_duration_secs: 160_000.0,
        };
        let report = shape(&current, &previous, 150, 100);

        assert_eq!(report.total_visits, 1200);
        assert_eq!(report.total_visits_change, 20);
        assert_eq!(report.conversions, 150);
        assert_eq!(report.conversions_change, 50);
        assert_eq!(report.bounce_rate, 34);
        // previous bounce rate is 50%: (34 - 50) / 50 = -32%
        assert_eq!(report.bounce_rate_change, -32);
        assert_eq!(report.avg_duration, 245);
        // previous avg duration is 200s: (245 - 200) / 200 = 22.5 -> 23%
        assert_eq!(report.avg_duration_change, 23);
    }

    #[test]
    fn test_shape_zero_previous_period_changes_are_zero() {
        let current = VisitTotalsRow {
            visits: 500,
            sessions: 400,
            bounces: 100,
            total_duration_secs: 80_000.0,
        };
        let report = shape(&current, &VisitTotalsRow::default(), 50, 0);
        assert_eq!(report.total_visits_change, 0);
        assert_eq!(report.conversions_change, 0);
        assert_eq!(report.bounce_rate_change, 0);
        assert_eq!(report.avg_duration_change, 0);
    }

    #[test]
    fn test_fallback_matches_dashboard_placeholders() {
        let report = fallback();
        assert_eq!(report.total_visits, 45231);
        assert_eq!(report.total_visits_change, 12);
        assert_eq!(report.conversions, 1205);
        assert_eq!(report.conversions_change, 8);
        assert_eq!(report.bounce_rate, 34);
        assert_eq!(report.bounce_rate_change, -5);
        assert_eq!(report.avg_duration, 245);
        assert_eq!(report.avg_duration_change, 15);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(fallback()).unwrap();
        assert_eq!(json["totalVisits"], 45231);
        assert_eq!(json["bounceRateChange"], -5);
        assert!(json.get("total_visits").is_none());
    }
}
