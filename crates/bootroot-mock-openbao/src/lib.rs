//! Mock OpenBao for bootroot end-to-end tests
//!
//! A small HTTP server that emulates the slice of OpenBao the bootroot agent
//! depends on:
//!
//! - `POST /v1/auth/approle/login`
//! - `GET  /v1/sys/health`
//! - `GET  /v1/secret/data/bootroot/services/{service}/{item}`
//!
//! plus a test-only control API (`/control/set-version`,
//! `/control/fail-next`, `/control/reset`) that lets a driver rotate secrets
//! and inject one-shot read failures while an agent is running against it.
//!
//! ```rust,ignore
//! use bootroot_mock_openbao::{ControlClient, MockOpenBao, SecretItem, SimulatorConfig};
//!
//! let server = MockOpenBao::new(SimulatorConfig::ephemeral()).spawn().await?;
//! let client = ControlClient::new(server.base_url());
//!
//! client.set_version("edge-proxy", SecretItem::Trust, 2).await?;
//! client.fail_next("edge-proxy", SecretItem::Trust, 1).await?;
//! ```

pub mod client;
pub mod config;
pub mod control;
pub mod item;
pub mod payload;
pub mod server;
pub mod store;

pub use client::{ClientError, ControlClient, SecretRead};
pub use config::{ConfigError, SimulatorConfig};
pub use control::{ControlError, FailNext, SetVersion};
pub use item::{SecretItem, SecretKey, UnknownItem};
pub use server::{router, ApiError, MockOpenBao, RunningServer, SimulatorError, SimulatorState};
pub use store::{ItemState, ReadOutcome, SecretStore};
