//! Layout manifest and per-node state documents
//!
//! `layout.json` is the index drivers use to find every generated artifact;
//! all paths in it are absolute. `state.json` is the agent's pre-sync view of
//! each service on a node; its paths are relative to the node work dir.

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{MaterializeError, Result};

/// Read and decode a JSON document.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|source| MaterializeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| MaterializeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Global manifest written to `<artifact_dir>/layout.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Id of the scenario this tree was built from.
    pub scenario_id: String,
    /// Nodes in scenario order.
    pub nodes: Vec<LayoutNode>,
    /// Every service across all nodes, in scenario order.
    pub services: Vec<ServiceLayout>,
}

/// Per-node slice of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutNode {
    /// Node id from the scenario.
    pub node_id: String,
    /// `<artifact_dir>/nodes/<node_id>`.
    pub work_dir: PathBuf,
    /// This node's services, in scenario order.
    pub services: Vec<ServiceLayout>,
}

/// Absolute paths to everything generated for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLayout {
    /// Hosting node.
    pub node_id: String,
    /// Service name.
    pub service_name: String,
    /// Deployment kind, copied from the scenario.
    pub deploy_type: String,
    /// Instance id, copied from the scenario.
    pub instance_id: String,
    /// Container name, copied from the scenario.
    pub container_name: Option<String>,
    /// Node work directory.
    pub work_dir: PathBuf,
    /// Node `state.json`.
    pub state_path: PathBuf,
    /// Seed AppRole role id.
    pub role_id_path: PathBuf,
    /// Seed AppRole secret id.
    pub secret_id_path: PathBuf,
    /// Seed EAB credentials.
    pub eab_file_path: PathBuf,
    /// Agent TOML config.
    pub agent_config_path: PathBuf,
    /// Stub certificate.
    pub cert_path: PathBuf,
    /// Stub private key.
    pub key_path: PathBuf,
    /// Written by the agent after its first trust sync.
    pub ca_bundle_path: PathBuf,
    /// Written by the agent after a run.
    pub summary_json_path: PathBuf,
}

impl Layout {
    /// Empty manifest for `scenario_id`.
    pub fn new(scenario_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            nodes: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Read a manifest written by a previous run.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    /// Look a service up by node and name.
    pub fn service(&self, node_id: &str, service_name: &str) -> Option<&ServiceLayout> {
        self.services
            .iter()
            .find(|s| s.node_id == node_id && s.service_name == service_name)
    }
}

/// Status of one synced item as the agent records it.
///
/// Generation only ever writes `pending`; the agent rewrites the field in
/// place as it syncs, so reading a `state.json` back after a run yields any
/// of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// The item does not apply to this service.
    None,
    /// Not synced yet.
    #[default]
    Pending,
    /// Synced and applied (or already current).
    Applied,
    /// The last sync attempt failed.
    Failed,
    /// The synced material has expired.
    Expired,
}

/// Sync progress for the four items the agent pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncStatusSet {
    /// AppRole secret id.
    pub secret_id: SyncStatus,
    /// EAB credentials.
    pub eab: SyncStatus,
    /// HTTP-01 responder HMAC.
    pub responder_hmac: SyncStatus,
    /// CA trust bundle.
    pub trust_sync: SyncStatus,
}

impl SyncStatusSet {
    /// Nothing has synced yet.
    pub fn pending() -> Self {
        Self::default()
    }

    /// True when every item is at `status`.
    pub fn all(&self, status: SyncStatus) -> bool {
        [self.secret_id, self.eab, self.responder_hmac, self.trust_sync]
            .iter()
            .all(|s| *s == status)
    }
}

/// How secrets reach the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    /// Written directly on the control node; no remote sync.
    LocalFile,
    /// Pulled from OpenBao by the agent on the service's node.
    RemoteBootstrap,
}

/// AppRole metadata recorded for a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRoleRecord {
    /// AppRole name.
    pub role_name: String,
    /// Seed role id.
    pub role_id: String,
    /// Secret id file, relative to the node work dir.
    pub secret_id_path: String,
    /// Policy attached to the role.
    pub policy_name: String,
}

/// One service entry in `state.json`. Paths are relative to the node work
/// dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    /// Service name.
    pub service_name: String,
    /// Deployment kind.
    pub deploy_type: String,
    /// How secrets are delivered.
    pub delivery_mode: DeliveryMode,
    /// Per-item sync progress.
    pub sync_status: SyncStatusSet,
    /// Node hostname.
    pub hostname: String,
    /// DNS suffix.
    pub domain: String,
    /// Agent config.
    pub agent_config_path: String,
    /// Certificate.
    pub cert_path: String,
    /// Private key.
    pub key_path: String,
    /// Instance id.
    pub instance_id: String,
    /// Container name, if any.
    pub container_name: Option<String>,
    /// Free-form operator notes.
    pub notes: Option<String>,
    /// AppRole metadata.
    pub approle: AppRoleRecord,
}

/// `<node>/state.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// OpenBao address the agent talks to.
    pub openbao_url: String,
    /// KV v2 mount holding service secrets.
    pub kv_mount: String,
    /// Secrets directory, relative to the node work dir.
    pub secrets_dir: String,
    /// Policy name to policy path.
    #[serde(default)]
    pub policies: BTreeMap<String, String>,
    /// AppRole name to role id.
    #[serde(default)]
    pub approles: BTreeMap<String, String>,
    /// Keyed by service name, in scenario order.
    pub services: IndexMap<String, ServiceState>,
}

impl NodeState {
    /// Empty state pointing at `openbao_url` and `kv_mount`.
    pub fn new(openbao_url: impl Into<String>, kv_mount: impl Into<String>) -> Self {
        Self {
            openbao_url: openbao_url.into(),
            kv_mount: kv_mount.into(),
            secrets_dir: "secrets".to_string(),
            policies: BTreeMap::new(),
            approles: BTreeMap::new(),
            services: IndexMap::new(),
        }
    }

    /// Read a `state.json`, including one the agent has since updated.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sync_status_serializes_lowercase() {
        let set = SyncStatusSet::pending();
        assert_eq!(
            serde_json::to_value(set).unwrap(),
            json!({
                "secret_id": "pending",
                "eab": "pending",
                "responder_hmac": "pending",
                "trust_sync": "pending",
            })
        );
        assert!(set.all(SyncStatus::Pending));
    }

    #[test]
    fn test_partial_sync_is_not_all_pending() {
        let set = SyncStatusSet {
            eab: SyncStatus::Applied,
            ..SyncStatusSet::pending()
        };
        assert!(!set.all(SyncStatus::Pending));
    }

    #[test]
    fn test_delivery_mode_wire_name() {
        assert_eq!(
            serde_json::to_value(DeliveryMode::RemoteBootstrap).unwrap(),
            json!("remote-bootstrap")
        );
    }

    #[test]
    fn test_node_state_keeps_insertion_order() {
        let mut state = NodeState::new("http://127.0.0.1:8200", "secret");
        for name in ["zeta", "alpha", "mid"] {
            state.services.insert(
                name.to_string(),
                ServiceState {
                    service_name: name.to_string(),
                    deploy_type: "daemon".to_string(),
                    delivery_mode: DeliveryMode::RemoteBootstrap,
                    sync_status: SyncStatusSet::pending(),
                    hostname: "node-1".to_string(),
                    domain: "trusted.domain".to_string(),
                    agent_config_path: format!("configs/{name}.toml"),
                    cert_path: format!("certs/{name}.crt"),
                    key_path: format!("certs/{name}.key"),
                    instance_id: "001".to_string(),
                    container_name: None,
                    notes: None,
                    approle: AppRoleRecord {
                        role_name: format!("bootroot-service-{name}"),
                        role_id: format!("role-{name}"),
                        secret_id_path: format!("secrets/services/{name}/secret_id"),
                        policy_name: format!("bootroot-service-{name}"),
                    },
                },
            );
        }
        let text = serde_json::to_string(&state).unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        let alpha = text.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);

        let back: NodeState = serde_json::from_str(&text).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.services["mid"].container_name, None);
    }

    #[test]
    fn test_loads_state_updated_by_agent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let doc = json!({
            "openbao_url": "http://127.0.0.1:8200",
            "kv_mount": "secret",
            "secrets_dir": "secrets",
            "services": {
                "edge-proxy": {
                    "service_name": "edge-proxy",
                    "deploy_type": "daemon",
                    "delivery_mode": "local-file",
                    "sync_status": {
                        "secret_id": "applied",
                        "eab": "failed",
                        "responder_hmac": "none",
                        "trust_sync": "expired"
                    },
                    "hostname": "node-1",
                    "domain": "trusted.domain",
                    "agent_config_path": "configs/edge-proxy.toml",
                    "cert_path": "certs/edge-proxy.crt",
                    "key_path": "certs/edge-proxy.key",
                    "instance_id": "001",
                    "container_name": null,
                    "notes": "rotated by hand",
                    "approle": {
                        "role_name": "bootroot-service-edge-proxy",
                        "role_id": "role-edge-proxy",
                        "secret_id_path": "secrets/services/edge-proxy/secret_id",
                        "policy_name": "bootroot-service-edge-proxy"
                    }
                }
            }
        });
        std::fs::write(&path, doc.to_string()).unwrap();

        let state = NodeState::load(&path).unwrap();
        let entry = &state.services["edge-proxy"];
        assert_eq!(entry.delivery_mode, DeliveryMode::LocalFile);
        assert_eq!(
            entry.sync_status,
            SyncStatusSet {
                secret_id: SyncStatus::Applied,
                eab: SyncStatus::Failed,
                responder_hmac: SyncStatus::None,
                trust_sync: SyncStatus::Expired,
            }
        );
        assert!(!entry.sync_status.all(SyncStatus::Pending));
        assert!(state.policies.is_empty());
    }

    #[test]
    fn test_rejects_unknown_sync_status() {
        let err = serde_json::from_value::<SyncStatus>(json!("unchanged")).unwrap_err();
        assert!(err.to_string().contains("unknown variant"));
    }
}
