//! Baseline workspace generation for bootroot end-to-end tests
//!
//! Turns a scenario document (nodes hosting services) into the directory tree
//! an agent expects to find before its first sync: seed AppRole credentials,
//! EAB material, per-service agent configs, self-signed stub certificates,
//! a per-node `state.json` and a global `layout.json` manifest.
//!
//! ```rust,ignore
//! use bootroot_e2e_workspace::{Materializer, MaterializerConfig, RcgenIssuer, Scenario};
//!
//! let scenario = Scenario::load("scenario.json".as_ref())?;
//! let config = MaterializerConfig::default();
//! let layout = Materializer::with_issuer(config, RcgenIssuer::default())
//!     .run(&scenario, "artifacts".as_ref())?;
//! ```

pub mod agent_config;
pub mod config;
pub mod error;
pub mod fs_util;
pub mod issuer;
pub mod layout;
pub mod materialize;
pub mod scenario;

pub use agent_config::AgentConfig;
pub use config::{ConfigError, IssuerKind, MaterializerConfig};
pub use error::{MaterializeError, Result};
pub use fs_util::FsError;
pub use issuer::{CertIdentity, CertIssuer, IssueError, IssuedCert, OpensslIssuer, RcgenIssuer};
pub use layout::{
    AppRoleRecord, DeliveryMode, Layout, LayoutNode, NodeState, ServiceLayout, ServiceState,
    SyncStatus, SyncStatusSet,
};
pub use materialize::Materializer;
pub use scenario::{Node, Scenario, Service};
