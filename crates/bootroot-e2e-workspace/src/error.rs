//! Materializer errors
//!
//! Every variant is fatal: the run stops at the first failure and the
//! artifact directory is left as-is.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::fs_util::FsError;
use crate::issuer::IssueError;

/// Why a materialization run aborted.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File being read.
        path: PathBuf,
        /// OS error.
        source: std::io::Error,
    },

    /// An input file is not valid JSON for its schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// The materializer settings are unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The scenario would produce an ambiguous or unsafe tree.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    /// Writing part of the tree failed.
    #[error(transparent)]
    Io(#[from] FsError),

    /// A document could not be serialized.
    #[error("failed to encode {path}: {source}")]
    Encode {
        /// File being written.
        path: PathBuf,
        /// Encoder error.
        source: serde_json::Error,
    },

    /// An agent config could not be rendered.
    #[error("failed to render agent config for {service}: {source}")]
    AgentConfig {
        /// Service whose config failed.
        service: String,
        /// Encoder error.
        source: toml::ser::Error,
    },

    /// The certificate issuer failed.
    #[error("certificate issuance failed for {service}: {source}")]
    Issue {
        /// Service whose certificate failed.
        service: String,
        /// Issuer error.
        source: IssueError,
    },
}

/// Result alias for materializer operations.
pub type Result<T> = std::result::Result<T, MaterializeError>;
