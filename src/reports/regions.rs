use super::{pct_change, round_count, DateRange};
use crate::db::{self, QueryError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;

/// Revenue and units for one region, with week-over-week revenue change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSales {
    pub region: String,
    pub revenue: i64,
    pub units: i64,
    pub revenue_change: i64,
}

/// Placeholder regional breakdown served when the store cannot be queried.
pub fn fallback() -> Vec<RegionSales> {
    [
        ("North America", 52_300, 870, 14),
        ("Europe", 41_750, 698, 9),
        ("Asia Pacific", 33_120, 552, 21),
        ("Latin America", 12_480, 204, -3),
        ("Middle East & Africa", 7_150, 106, 5),
    ]
    .into_iter()
    .map(|(region, revenue, units, revenue_change)| RegionSales {
        region: region.to_string(),
        revenue,
        units,
        revenue_change,
    })
    .collect()
}

#[derive(Debug, sqlx::FromRow)]
struct RegionRow {
    region: String,
    revenue: f64,
    units: i64,
}

const REGION_SQL: &str = "\
    SELECT COALESCE(region, '(unknown)') AS region,
           COALESCE(SUM(revenue), 0)::FLOAT8 AS revenue,
           COALESCE(SUM(units), 0)::BIGINT AS units
    FROM sales_summaries
    WHERE bucket_ts >= $1 AND bucket_ts <= $2
    GROUP BY region
    ORDER BY revenue DESC";

async fn region_rows(
    pool: &PgPool,
    range: DateRange,
    label: &'static str,
) -> Result<Vec<RegionRow>, QueryError> {
    db::fetch_all(
        label,
        sqlx::query_as::<_, RegionRow>(REGION_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool),
    )
    .await
}

/// Query the per-region breakdown, joining the lagged period in memory to
/// derive each region's revenue change. Both periods run concurrently.
pub async fn live(
    pool: &PgPool,
    range: DateRange,
    lag_days: i64,
) -> Result<Vec<RegionSales>, QueryError> {
    let prev = range.previous(lag_days);
    let (current, previous) = tokio::try_join!(
        region_rows(pool, range, "regions_current"),
        region_rows(pool, prev, "regions_previous"),
    )?;

    Ok(shape(current, &previous))
}

/// Regions absent from the previous period report a change of zero (the
/// zero-baseline rule), not a spurious +100%.
fn shape(current: Vec<RegionRow>, previous: &[RegionRow]) -> Vec<RegionSales> {
    let prev_revenue: HashMap<&str, f64> = previous
        .iter()
        .map(|r| (r.region.as_str(), r.revenue))
        .collect();

    current
        .into_iter()
        .map(|r| {
            let baseline = prev_revenue.get(r.region.as_str()).copied().unwrap_or(0.0);
            RegionSales {
                revenue: round_count(r.revenue),
                units: r.units,
                revenue_change: pct_change(r.revenue, baseline),
                region: r.region,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(region: &str, revenue: f64, units: i64) -> RegionRow {
        RegionRow {
            region: region.to_string(),
            revenue,
            units,
        }
    }

    #[test]
    fn test_shape_joins_previous_period_by_region() {
        let current = vec![row("Europe", 1200.0, 30), row("Asia Pacific", 500.0, 12)];
        let previous = vec![row("Europe", 1000.0, 25)];
        let regions = shape(current, &previous);

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].region, "Europe");
        assert_eq!(regions[0].revenue, 1200);
        assert_eq!(regions[0].revenue_change, 20);
        // No baseline for Asia Pacific: change is zero, not infinity
        assert_eq!(regions[1].revenue_change, 0);
    }

    #[test]
    fn test_shape_empty_periods() {
        assert!(shape(Vec::new(), &[]).is_empty());
    }

    #[test]
    fn test_fallback_is_ordered_by_revenue() {
        let regions = fallback();
        assert!(!regions.is_empty());
        assert!(regions.windows(2).all(|w| w[0].revenue >= w[1].revenue));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(fallback()).unwrap();
        assert!(json[0].get("revenueChange").is_some());
        assert!(json[0].get("revenue_change").is_none());
    }
}
