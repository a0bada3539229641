use std::future::Future;
use std::time::Instant;

/// A failed warehouse query, labeled with which query broke and how long it
/// ran before failing.
#[derive(Debug)]
pub struct QueryError {
    query: &'static str,
    elapsed_ms: u64,
    source: sqlx::Error,
}

impl QueryError {
    /// The label of the query that failed.
    pub const fn query(&self) -> &'static str {
        self.query
    }
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "query '{}' failed after {}ms: {}",
            self.query, self.elapsed_ms, self.source
        )
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Run a multi-row query future with timing instrumentation.
///
/// Logs duration and row count on success; logs duration and wraps the error
/// on failure. Pass-through otherwise — no retry, no caching.
pub async fn fetch_all<T, F>(query: &'static str, fut: F) -> Result<Vec<T>, QueryError>
where
    F: Future<Output = Result<Vec<T>, sqlx::Error>>,
{
    let started = Instant::now();
    match fut.await {
        Ok(rows) => {
            tracing::debug!(
                query,
                elapsed_ms = elapsed_ms(started),
                rows = rows.len(),
                "Query completed"
            );
            Ok(rows)
        }
        Err(source) => {
            let elapsed_ms = elapsed_ms(started);
            tracing::warn!(query, elapsed_ms, error = %source, "Query failed");
            Err(QueryError {
                query,
                elapsed_ms,
                source,
            })
        }
    }
}

/// Run a single-row query future with timing instrumentation.
///
/// Same contract as [`fetch_all`] for queries that return exactly one row
/// (aggregates without GROUP BY).
pub async fn fetch_one<T, F>(query: &'static str, fut: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let started = Instant::now();
    match fut.await {
        Ok(row) => {
            tracing::debug!(
                query,
                elapsed_ms = elapsed_ms(started),
                rows = 1,
                "Query completed"
            );
            Ok(row)
        }
        Err(source) => {
            let elapsed_ms = elapsed_ms(started);
            tracing::warn!(query, elapsed_ms, error = %source, "Query failed");
            Err(QueryError {
                query,
                elapsed_ms,
                source,
            })
        }
    }
}
