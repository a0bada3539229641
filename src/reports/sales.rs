use super::{as_f64, pct_change, round_count, DateRange, WEEKDAYS};
use crate::db::{self, QueryError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Sales report: a dense Monday..Sunday revenue/units series plus totals
/// with week-over-week change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub weekdays: Vec<DaySales>,
    /// Total revenue for the range, rounded to whole currency units.
    pub total_revenue: i64,
    pub total_revenue_change: i64,
    pub total_units: i64,
    pub total_units_change: i64,
}

/// One weekday bucket, zero-filled when no sales landed on that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySales {
    pub day: String,
    pub revenue: i64,
    pub units: i64,
}

/// Placeholder sales report served when the store cannot be queried.
pub fn fallback() -> SalesReport {
    let revenue = [18450, 16200, 17890, 19340, 22150, 28760, 24010];
    SalesReport {
        weekdays: WEEKDAYS
            .iter()
            .zip(revenue)
            .map(|(day, revenue)| DaySales {
                day: (*day).to_string(),
                revenue,
                units: revenue / 60,
            })
            .collect(),
        total_revenue: 146_800,
        total_revenue_change: 11,
        total_units: 2430,
        total_units_change: 6,
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WeekdayRow {
    day_of_week: i64,
    revenue: f64,
    units: i64,
}

#[derive(Debug, Default, sqlx::FromRow)]
struct TotalsRow {
    revenue: f64,
    units: i64,
}

const WEEKDAY_SQL: &str = "\
    SELECT EXTRACT(ISODOW FROM bucket_ts)::BIGINT AS day_of_week,
           COALESCE(SUM(revenue), 0)::FLOAT8 AS revenue,
           COALESCE(SUM(units), 0)::BIGINT AS units
    FROM sales_summaries
    WHERE bucket_ts >= $1 AND bucket_ts <= $2
    GROUP BY day_of_week
    ORDER BY day_of_week";

const TOTALS_SQL: &str = "\
    SELECT COALESCE(SUM(revenue), 0)::FLOAT8 AS revenue,
           COALESCE(SUM(units), 0)::BIGINT AS units
    FROM sales_summaries
    WHERE bucket_ts >= $1 AND bucket_ts <= $2";

async fn weekday_rows(pool: &PgPool, range: DateRange) -> Result<Vec<WeekdayRow>, QueryError> {
    db::fetch_all(
        "sales_weekdays",
        sqlx::query_as::<_, WeekdayRow>(WEEKDAY_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool),
    )
    .await
}

async fn totals(
    pool: &PgPool,
    range: DateRange,
    label: &'static str,
) -> Result<TotalsRow, QueryError> {
    db::fetch_one(
        label,
        sqlx::query_as::<_, TotalsRow>(TOTALS_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(pool),
    )
    .await
}

/// Query the sales report for a date range. Weekday series and both period
/// totals run concurrently.
pub async fn live(
    pool: &PgPool,
    range: DateRange,
    lag_days: i64,
) -> Result<SalesReport, QueryError> {
    let prev = range.previous(lag_days);
    let (weekdays, current, previous) = tokio::try_join!(
        weekday_rows(pool, range),
        totals(pool, range, "sales_totals_current"),
        totals(pool, prev, "sales_totals_previous"),
    )?;

    Ok(SalesReport {
        weekdays: fill_week(&weekdays),
        total_revenue: round_count(current.revenue),
        total_revenue_change: pct_change(current.revenue, previous.revenue),
        total_units: current.units,
        total_units_change: pct_change(as_f64(current.units), as_f64(previous.units)),
    })
}

/// Expand day-of-week grouped rows into a dense Monday..Sunday series.
fn fill_week(rows: &[WeekdayRow]) -> Vec<DaySales> {
    (1..=7_i64)
        .map(|dow| {
            let day = WEEKDAYS[usize::try_from(dow).unwrap_or(1) - 1].to_string();
            rows.iter().find(|r| r.day_of_week == dow).map_or_else(
                || DaySales {
                    day: day.clone(),
                    revenue: 0,
                    units: 0,
                },
                |r| DaySales {
                    day: day.clone(),
                    revenue: round_count(r.revenue),
                    units: r.units,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_week_is_always_dense() {
        let rows = vec![WeekdayRow {
            day_of_week: 3,
            revenue: 1234.49,
            units: 20,
        }];
        let week = fill_week(&rows);
        assert_eq!(week.len(), 7);
        assert_eq!(week[2].day, "Wed");
        // rounded to nearest whole currency unit
        assert_eq!(week[2].revenue, 1234);
        assert_eq!(week[2].units, 20);
        assert!(week.iter().enumerate().all(|(i, d)| i == 2 || d.revenue == 0));
    }

    #[test]
    fn test_fill_week_rounds_half_up() {
        let rows = vec![WeekdayRow {
            day_of_week: 1,
            revenue: 99.5,
            units: 1,
        }];
        assert_eq!(fill_week(&rows)[0].revenue, 100);
    }

    #[test]
    fn test_fallback_shape() {
        let report = fallback();
        assert_eq!(report.weekdays.len(), 7);
        assert!(report.total_revenue > 0);
        assert!(report.total_units > 0);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(fallback()).unwrap();
        assert!(json.get("totalRevenueChange").is_some());
        assert!(json.get("total_revenue_change").is_none());
    }
}
