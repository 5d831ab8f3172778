//! Materializer configuration

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Domain appended to every synthetic DNS name.
pub const DEFAULT_DOMAIN: &str = "trusted.domain";

/// OpenBao address recorded in each node's `state.json`.
pub const DEFAULT_OPENBAO_URL: &str = "http://127.0.0.1:8200";

/// KV mount recorded in each node's `state.json`.
pub const DEFAULT_KV_MOUNT: &str = "secret";

/// Which backend produces the stub certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IssuerKind {
    /// `openssl req -x509` subprocess, RSA-2048.
    #[default]
    Openssl,
    /// In-process generation, no external binary required.
    Rcgen,
}

/// Settings that shape the generated workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializerConfig {
    /// DNS suffix of every issued certificate.
    pub domain: String,
    /// OpenBao address written into `state.json`.
    pub openbao_url: String,
    /// KV v2 mount written into `state.json`.
    pub kv_mount: String,
    /// Certificate lifetime in days.
    pub cert_validity_days: u32,
    /// Certificate backend.
    pub issuer: IssuerKind,
    /// Executable copied to `bin/bootroot-agent`. A shell no-op is written
    /// when unset.
    pub agent_stub: Option<PathBuf>,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            openbao_url: DEFAULT_OPENBAO_URL.to_string(),
            kv_mount: DEFAULT_KV_MOUNT.to_string(),
            cert_validity_days: 1,
            issuer: IssuerKind::default(),
            agent_stub: None,
        }
    }
}

/// Failures loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file path.
        path: String,
        /// OS error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this config.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file path.
        path: String,
        /// Parser error.
        source: toml::de::Error,
    },

    /// Certificates must be valid for at least one day.
    #[error("cert_validity_days must be at least 1")]
    ZeroValidity,
}

impl MaterializerConfig {
    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cert_validity_days == 0 {
            return Err(ConfigError::ZeroValidity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MaterializerConfig::default();
        assert_eq!(config.domain, "trusted.domain");
        assert_eq!(config.kv_mount, "secret");
        assert_eq!(config.cert_validity_days, 1);
        assert_eq!(config.issuer, IssuerKind::Openssl);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materializer.toml");
        std::fs::write(&path, "issuer = \"rcgen\"\ndomain = \"example.test\"\n").unwrap();

        let config = MaterializerConfig::from_file(&path).unwrap();
        assert_eq!(config.issuer, IssuerKind::Rcgen);
        assert_eq!(config.domain, "example.test");
        assert_eq!(config.openbao_url, DEFAULT_OPENBAO_URL);
    }

    #[test]
    fn test_zero_validity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materializer.toml");
        std::fs::write(&path, "cert_validity_days = 0\n").unwrap();
        assert!(matches!(
            MaterializerConfig::from_file(&path),
            Err(ConfigError::ZeroValidity)
        ));
    }
}
