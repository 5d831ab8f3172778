//! Secret item catalogue
//!
//! The agent pulls exactly four items per service from the KV mount. Anything
//! outside this set is not a secret the simulator knows how to render.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the per-service secrets the agent synchronises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretItem {
    /// AppRole secret id used for the next login.
    SecretId,
    /// ACME external account binding (key id + HMAC).
    Eab,
    /// Shared HMAC between the agent and the HTTP-01 responder.
    HttpResponderHmac,
    /// CA fingerprints and PEM bundle.
    Trust,
}

impl SecretItem {
    /// Every item, in path-segment order.
    pub const ALL: [SecretItem; 4] = [
        SecretItem::SecretId,
        SecretItem::Eab,
        SecretItem::HttpResponderHmac,
        SecretItem::Trust,
    ];

    /// Path segment used under `bootroot/services/<service>/`.
    pub fn as_str(self) -> &'static str {
        match self {
            SecretItem::SecretId => "secret_id",
            SecretItem::Eab => "eab",
            SecretItem::HttpResponderHmac => "http_responder_hmac",
            SecretItem::Trust => "trust",
        }
    }
}

impl fmt::Display for SecretItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a path segment or control field names no known item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown secret item: {0}")]
pub struct UnknownItem(pub String);

impl FromStr for SecretItem {
    type Err = UnknownItem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecretItem::ALL
            .into_iter()
            .find(|item| item.as_str() == s)
            .ok_or_else(|| UnknownItem(s.to_string()))
    }
}

/// Compound key under which the simulator tracks counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretKey {
    /// Service name as it appears in the secret path.
    pub service: String,
    /// Which secret of that service.
    pub item: SecretItem,
}

impl SecretKey {
    /// Key for `item` of `service`.
    pub fn new(service: impl Into<String>, item: SecretItem) -> Self {
        Self {
            service: service.into(),
            item,
        }
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.item)
    }
}
