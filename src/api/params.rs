use crate::api::errors::ApiError;
use crate::reports::DateRange;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// SKU identifier used when the caller omits `skuId`.
pub const DEFAULT_SKU_ID: &str = "ID140001";

/// Query parameters for date-ranged report endpoints.
///
/// `from`/`to` deserialize as optional so a missing parameter produces this
/// API's own 400 JSON error instead of the extractor's default rejection.
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RangeParams {
    /// Validate and parse the required range. Runs before any query.
    pub fn date_range(&self) -> Result<DateRange, ApiError> {
        let from = parse_timestamp("from", self.from.as_deref())?;
        let to = parse_timestamp("to", self.to.as_deref())?;
        if from > to {
            return Err(ApiError::BadRequest(
                "'from' must not be after 'to'".to_string(),
            ));
        }
        Ok(DateRange::new(from, to))
    }
}

/// Query parameters for the SKU detail endpoint.
#[derive(Debug, Deserialize)]
pub struct SkuParams {
    #[serde(rename = "skuId", default = "default_sku_id")]
    pub sku_id: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn default_sku_id() -> String {
    DEFAULT_SKU_ID.to_string()
}

impl SkuParams {
    pub fn date_range(&self) -> Result<DateRange, ApiError> {
        RangeParams {
            from: self.from.clone(),
            to: self.to.clone(),
        }
        .date_range()
    }
}

fn parse_timestamp(name: &str, value: Option<&str>) -> Result<DateTime<Utc>, ApiError> {
    let Some(raw) = value else {
        return Err(ApiError::BadRequest(format!(
            "Missing required parameter: {name}"
        )));
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            ApiError::BadRequest(format!(
                "Invalid {name}: expected an RFC 3339 timestamp, got '{raw}'"
            ))
        })
}
