//! Pulseboard — commerce analytics dashboard backend.
//!
//! A read-only reporting layer over a TimescaleDB/Postgres warehouse: axum
//! report endpoints validate a caller-supplied date range, per-report
//! aggregation modules run parameterized SQL, and a uniform fallback policy
//! serves static placeholder reports when the store is unreachable.

pub mod api;
pub mod config;
pub mod db;
pub mod reports;
pub mod server;
