//! Agent configuration documents
//!
//! Renders the TOML the bootroot agent reads at startup. Trust material is a
//! placeholder: the agent is expected to replace it on its first trust sync.

use serde::{Deserialize, Serialize};

/// Responder HMAC seeded before the first sync.
pub const SEED_RESPONDER_HMAC: &str = "seed-responder-hmac";

/// All-zero SHA-256 standing in for the CA fingerprint.
pub const PLACEHOLDER_CA_SHA256: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Top-level agent config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// ACME client settings.
    pub acme: AcmeSection,
    /// Trust anchors accepted before the first trust sync.
    pub trust: TrustSection,
    /// One entry per managed identity.
    pub profiles: Vec<Profile>,
}

/// `[acme]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcmeSection {
    /// HMAC shared with the HTTP-01 responder.
    pub http_responder_hmac: String,
}

/// `[trust]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSection {
    /// Pinned CA fingerprints, hex SHA-256.
    pub trusted_ca_sha256: Vec<String>,
}

/// One issued identity the agent manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Service the certificate is issued for.
    pub service_name: String,
    /// Instance id, first label of the DNS name.
    pub instance_id: String,
    /// Node hostname.
    pub hostname: String,
    /// Where the agent writes the issued pair.
    pub paths: ProfilePaths,
}

/// Paths relative to the node work directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePaths {
    /// Certificate path.
    pub cert: String,
    /// Private key path.
    pub key: String,
}

impl AgentConfig {
    /// Single-profile config for one service on `hostname`.
    pub fn for_service(service_name: &str, hostname: &str, instance_id: &str) -> Self {
        Self {
            acme: AcmeSection {
                http_responder_hmac: SEED_RESPONDER_HMAC.to_string(),
            },
            trust: TrustSection {
                trusted_ca_sha256: vec![PLACEHOLDER_CA_SHA256.to_string()],
            },
            profiles: vec![Profile {
                service_name: service_name.to_string(),
                instance_id: instance_id.to_string(),
                hostname: hostname.to_string(),
                paths: ProfilePaths {
                    cert: format!("certs/{service_name}.crt"),
                    key: format!("certs/{service_name}.key"),
                },
            }],
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}
