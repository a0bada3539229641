//! HTTP surface: parameter validation, error mapping, report handlers.

pub mod debug;
pub mod errors;
pub mod params;
pub mod reports;
