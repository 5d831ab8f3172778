//! Deterministic secret payloads
//!
//! A payload is a pure function of `(service, item, version)`. Drivers detect
//! rotation by comparing what they read against [`render`] for the version
//! they set, so nothing here may depend on time, randomness or call order.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::num::NonZeroU64;

use crate::item::SecretItem;

/// Token returned by every AppRole login.
pub const CLIENT_TOKEN: &str = "mock-client-token";

/// Item data without the KV-v2 envelope.
pub fn render_data(service: &str, item: SecretItem, version: NonZeroU64) -> Value {
    match item {
        SecretItem::SecretId => json!({
            "secret_id": format!("synced-secret-id-{service}-v{version}"),
        }),
        SecretItem::Eab => json!({
            "kid": format!("synced-kid-{service}-v{version}"),
            "hmac": format!("synced-hmac-{service}-v{version}"),
        }),
        SecretItem::HttpResponderHmac => json!({
            "hmac": format!("synced-responder-hmac-{service}-v{version}"),
        }),
        SecretItem::Trust => json!({
            "trusted_ca_sha256": [trust_fingerprint(service, version)],
            "ca_bundle_pem": trust_bundle_pem(service, version),
        }),
    }
}

/// Full KV-v2 read response: `{"data": {"data": ...}}`.
pub fn render(service: &str, item: SecretItem, version: NonZeroU64) -> Value {
    json!({ "data": { "data": render_data(service, item, version) } })
}

/// SHA-256 hex digest standing in for a CA fingerprint.
pub fn trust_fingerprint(service: &str, version: NonZeroU64) -> String {
    let digest = Sha256::digest(format!("{service}-v{version}").as_bytes());
    hex::encode(digest)
}

/// Placeholder PEM whose body encodes the service and version.
pub fn trust_bundle_pem(service: &str, version: NonZeroU64) -> String {
    format!("-----BEGIN CERTIFICATE-----\nSMOKE-{service}-v{version}\n-----END CERTIFICATE-----")
}

/// AppRole login response.
pub fn login_response() -> Value {
    json!({ "auth": { "client_token": CLIENT_TOKEN } })
}

/// `sys/health` response.
pub fn health_response() -> Value {
    json!({ "initialized": true, "sealed": false })
}
