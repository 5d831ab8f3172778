//! Simulator configuration
//!
//! Values come from an optional TOML file; the CLI and `MOCK_OPENBAO_PORT`
//! override whatever the file sets.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable consulted for the listen port.
pub const PORT_ENV: &str = "MOCK_OPENBAO_PORT";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 18200;

/// Default listen host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Where the simulator listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port; 0 asks the OS for an ephemeral port.
    pub port: u16,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
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
}

impl SimulatorConfig {
    /// Bind to loopback on an OS-assigned port.
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Self::default()
        }
    }

    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply CLI/env overrides on top of this config.
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_legacy_port() {
        let config = SimulatorConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:18200");
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        let config = SimulatorConfig::default().with_overrides(Some("::1".into()), Some(9000));
        assert_eq!(config.bind_address(), "[::1]:9000");
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"0.0.0.0\"\nport = 8200").unwrap();

        let config = SimulatorConfig::from_file(file.path())
            .unwrap()
            .with_overrides(None, Some(9100));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 8300").unwrap();

        let config = SimulatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 8300);
    }

    #[test]
    fn test_bad_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = SimulatorConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
