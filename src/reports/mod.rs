//! Report aggregation functions.
//!
//! One module per report, each exposing a `live` function (parameterized
//! aggregation queries against the warehouse) and a `fallback` constant of
//! the same shape. Handlers combine the two through [`with_fallback`], so a
//! report is always fully populated: live numbers when the store answers,
//! the placeholder constant when it does not.

pub mod demographics;
pub mod funnel;
pub mod kpis;
pub mod regions;
pub mod sales;
pub mod sku;
pub mod traffic;

use crate::db::QueryError;
use chrono::{DateTime, Duration, Utc};
use std::future::Future;

/// Weekday labels in ISO order (Monday first). Weekday-bucketed reports
/// always emit one entry per label, zero-filled when a day has no rows.
pub const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// A caller-supplied inclusive date range scoping one report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub const fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The comparison window: this range shifted back by `lag_days`.
    /// The lag is fixed per deployment, not derived from the range length.
    pub fn previous(&self, lag_days: i64) -> Self {
        let lag = Duration::days(lag_days);
        Self {
            from: self.from - lag,
            to: self.to - lag,
        }
    }
}

/// Period-over-period change as a whole percentage.
///
/// Zero when the previous period is zero, so empty baselines never produce
/// infinities or NaN.
#[allow(clippy::cast_possible_truncation)]
pub fn pct_change(current: f64, previous: f64) -> i64 {
    if previous == 0.0 {
        return 0;
    }
    (((current - previous) / previous) * 100.0).round() as i64
}

/// A part-of-whole ratio as a whole percentage. Zero when the whole is zero.
#[allow(clippy::cast_possible_truncation)]
pub fn rate_pct(part: f64, whole: f64) -> i64 {
    if whole == 0.0 {
        return 0;
    }
    ((part / whole) * 100.0).round() as i64
}

/// An average rounded to the nearest integer. Zero when the count is zero.
#[allow(clippy::cast_possible_truncation)]
pub fn round_avg(total: f64, count: f64) -> i64 {
    if count == 0.0 {
        return 0;
    }
    (total / count).round() as i64
}

/// Round a monetary or count value to the nearest integer. Formatting
/// (currency symbols, separators) is a presentation concern and stays out.
#[allow(clippy::cast_possible_truncation)]
pub fn round_count(value: f64) -> i64 {
    value.round() as i64
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn as_f64(value: i64) -> f64 {
    value as f64
}

/// Run a live report computation, substituting the fallback value on any
/// query failure.
///
/// This is the single degradation policy for every report: the failure is
/// logged with the report name, the partial result is discarded, and the
/// caller receives the fully-populated placeholder instead. All-or-nothing —
/// live and fallback fields are never merged.
pub async fn with_fallback<T, F>(report: &'static str, live: F, fallback: T) -> T
where
    F: Future<Output = Result<T, QueryError>>,
{
    match live.await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(report, error = %e, "Report query failed, serving fallback data");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_previous_range_is_lagged_by_seven_days() {
        let range = DateRange::new(utc("2025-01-08T00:00:00Z"), utc("2025-01-14T23:59:59Z"));
        let prev = range.previous(7);
        assert_eq!(prev.from, utc("2025-01-01T00:00:00Z"));
        assert_eq!(prev.to, utc("2025-01-07T23:59:59Z"));
    }

    #[test]
    fn test_previous_range_respects_configured_lag() {
        let range = DateRange::new(utc("2025-03-01T00:00:00Z"), utc("2025-03-02T00:00:00Z"));
        let prev = range.previous(28);
        assert_eq!(prev.from, utc("2025-02-01T00:00:00Z"));
        assert_eq!(prev.to, utc("2025-02-02T00:00:00Z"));
    }

    #[test]
    fn test_pct_change_zero_previous_is_zero() {
        assert_eq!(pct_change(500.0, 0.0), 0);
    }

    #[test]
    fn test_pct_change_growth() {
        assert_eq!(pct_change(150.0, 100.0), 50);
    }

    #[test]
    fn test_pct_change_decline() {
        assert_eq!(pct_change(75.0, 100.0), -25);
    }

    #[test]
    fn test_pct_change_rounds_to_nearest() {
        // 1/3 growth = 33.33...%
        assert_eq!(pct_change(4.0, 3.0), 33);
        // 2/3 growth = 66.66...%
        assert_eq!(pct_change(5.0, 3.0), 67);
    }

    #[test]
    fn test_rate_pct_zero_whole() {
        assert_eq!(rate_pct(10.0, 0.0), 0);
    }

    #[test]
    fn test_rate_pct_rounds() {
        assert_eq!(rate_pct(1.0, 3.0), 33);
        assert_eq!(rate_pct(2.0, 3.0), 67);
    }

    #[test]
    fn test_round_avg() {
        assert_eq!(round_avg(0.0, 0.0), 0);
        assert_eq!(round_avg(735.0, 3.0), 245);
    }

    #[tokio::test]
    async fn test_with_fallback_uses_live_value_on_success() {
        let value = with_fallback("test", async { Ok(7_i64) }, 99).await;
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_with_fallback_substitutes_on_failure() {
        let failing = crate::db::fetch_one::<i64, _>("boom", async {
            Err(sqlx::Error::PoolClosed)
        });
        let value = with_fallback("test", async { failing.await }, 99).await;
        assert_eq!(value, 99);
    }

    proptest! {
        #[test]
        fn prop_pct_change_zero_previous_always_zero(current in -1_000_000.0_f64..1_000_000.0) {
            prop_assert_eq!(pct_change(current, 0.0), 0);
        }

        #[test]
        fn prop_pct_change_is_finite_integer(
            current in -1_000_000.0_f64..1_000_000.0,
            previous in 1.0_f64..1_000_000.0,
        ) {
            // Any nonzero previous yields an ordinary integer percentage.
            let change = pct_change(current, previous);
            prop_assert!(change > i64::MIN && change < i64::MAX);
        }

        #[test]
        fn prop_rate_pct_bounded_for_parts(part in 0.0_f64..1_000_000.0, whole in 1.0_f64..1_000_000.0) {
            prop_assume!(part <= whole);
            let rate = rate_pct(part, whole);
            prop_assert!((0..=100).contains(&rate));
        }
    }
}
