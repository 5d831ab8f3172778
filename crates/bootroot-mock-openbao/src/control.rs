//! Control API request validation
//!
//! Control bodies are parsed and fully validated before the store is
//! touched, so a rejected call never leaves a half-applied update behind.

use serde::Deserialize;
use std::num::{NonZeroU32, NonZeroU64};

use crate::item::{SecretItem, SecretKey};

/// Reasons a control call is rejected with HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    /// Body is not JSON or a field has the wrong type.
    #[error("invalid control payload: {0}")]
    MalformedBody(String),

    /// `service` is absent or blank.
    #[error("invalid control payload: service must not be empty")]
    MissingService,

    /// `item` is absent or not a known secret item.
    #[error("invalid control payload: unknown item {0:?}")]
    UnknownItem(String),

    /// A numeric field is zero or negative.
    #[error("invalid control payload: {field} must be >= 1, got {value}")]
    NonPositive {
        /// Offending field name.
        field: &'static str,
        /// Value as sent.
        value: i64,
    },

    /// A numeric field does not fit its counter.
    #[error("invalid control payload: {field} is out of range: {value}")]
    OutOfRange {
        /// Offending field name.
        field: &'static str,
        /// Value as sent.
        value: i64,
    },
}

/// Wire shape shared by `set-version` and `fail-next`. Every field is
/// optional here so that missing fields surface as [`ControlError`]s rather
/// than opaque deserializer failures.
#[derive(Debug, Default, Deserialize)]
struct RawControlRequest {
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    version: Option<i64>,
    #[serde(default)]
    count: Option<i64>,
}

/// Validated `POST /control/set-version` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetVersion {
    /// Key whose version is overwritten.
    pub key: SecretKey,
    /// New version.
    pub version: NonZeroU64,
}

/// Validated `POST /control/fail-next` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailNext {
    /// Key whose reads will fail.
    pub key: SecretKey,
    /// Number of consecutive reads to fail.
    pub count: NonZeroU32,
}

impl SetVersion {
    /// Parse and validate a raw request body. `version` defaults to 1.
    pub fn from_body(body: &[u8]) -> Result<Self, ControlError> {
        let raw = parse(body)?;
        let key = validate_key(&raw)?;
        let version = positive("version", raw.version.unwrap_or(1))?;
        Ok(Self { key, version })
    }
}

impl FailNext {
    /// Parse and validate a raw request body. `count` defaults to 1.
    pub fn from_body(body: &[u8]) -> Result<Self, ControlError> {
        let raw = parse(body)?;
        let key = validate_key(&raw)?;
        let value = raw.count.unwrap_or(1);
        let count = NonZeroU32::try_from(positive("count", value)?).map_err(|_| {
            ControlError::OutOfRange {
                field: "count",
                value,
            }
        })?;
        Ok(Self { key, count })
    }
}

fn parse(body: &[u8]) -> Result<RawControlRequest, ControlError> {
    serde_json::from_slice(body).map_err(|e| ControlError::MalformedBody(e.to_string()))
}

fn validate_key(raw: &RawControlRequest) -> Result<SecretKey, ControlError> {
    let service = raw.service.as_deref().unwrap_or_default().trim();
    if service.is_empty() {
        return Err(ControlError::MissingService);
    }
    let item = raw.item.as_deref().unwrap_or_default().trim();
    let item: SecretItem = item
        .parse()
        .map_err(|_| ControlError::UnknownItem(item.to_string()))?;
    Ok(SecretKey::new(service, item))
}

fn positive(field: &'static str, value: i64) -> Result<NonZeroU64, ControlError> {
    u64::try_from(value)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or(ControlError::NonPositive { field, value })
}
