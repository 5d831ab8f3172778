//! Scenario materialization
//!
//! Expands a [`Scenario`] into the on-disk workspace the agent expects:
//!
//! ```text
//! <artifact_dir>/
//! ├── layout.json
//! └── nodes/<node_id>/
//!     ├── bin/bootroot-agent
//!     ├── certs/<service>.{crt,key}
//!     ├── configs/<service>.toml
//!     ├── secrets/services/<service>/{role_id,secret_id,eab.json}
//!     ├── summaries/
//!     └── state.json
//! ```
//!
//! Nodes and services are processed in scenario order so manifests are
//! reproducible. The first failure aborts the run; nothing is cleaned up.

use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::agent_config::AgentConfig;
use crate::config::{IssuerKind, MaterializerConfig};
use crate::error::{MaterializeError, Result};
use crate::fs_util::{self, FsError};
use crate::issuer::{CertIdentity, CertIssuer, OpensslIssuer, RcgenIssuer};
use crate::layout::{
    AppRoleRecord, DeliveryMode, Layout, LayoutNode, NodeState, ServiceLayout, ServiceState,
    SyncStatusSet,
};
use crate::scenario::{Node, Scenario, Service};

/// Script written when no compiled agent stub is configured.
pub const AGENT_STUB_SCRIPT: &str = "#!/usr/bin/env sh\nexit 0\n";

/// Name of the manifest at the artifact root.
pub const LAYOUT_FILE: &str = "layout.json";

/// Name of the per-node state file.
pub const STATE_FILE: &str = "state.json";

/// Seed role id for a service.
pub fn seed_role_id(service_name: &str) -> String {
    format!("role-{service_name}")
}

/// Seed secret id; never equal to anything the secret store renders.
pub fn seed_secret_id(service_name: &str) -> String {
    format!("seed-secret-{service_name}")
}

/// AppRole and policy name for a service.
pub fn service_role_name(service_name: &str) -> String {
    format!("bootroot-service-{service_name}")
}

/// Turns scenarios into workspaces.
pub struct Materializer {
    config: MaterializerConfig,
    issuer: Box<dyn CertIssuer>,
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Materializer {
    /// Use the issuer backend named in `config`.
    pub fn new(config: MaterializerConfig) -> Self {
        let issuer: Box<dyn CertIssuer> = match config.issuer {
            IssuerKind::Openssl => Box::new(OpensslIssuer::new(config.cert_validity_days)),
            IssuerKind::Rcgen => Box::new(RcgenIssuer::new(config.cert_validity_days)),
        };
        Self { config, issuer }
    }

    /// Use a caller-supplied issuer.
    pub fn with_issuer(config: MaterializerConfig, issuer: impl CertIssuer + 'static) -> Self {
        Self {
            config,
            issuer: Box::new(issuer),
        }
    }

    /// Settings this materializer was built with.
    pub fn config(&self) -> &MaterializerConfig {
        &self.config
    }

    /// Materialize `scenario` under `artifact_dir` (created if absent) and
    /// return the manifest that was written to `layout.json`.
    pub fn run(&self, scenario: &Scenario, artifact_dir: &Path) -> Result<Layout> {
        self.config.validate()?;
        scenario.validate()?;

        fs_util::ensure_dir(artifact_dir)?;
        let artifact_dir = fs::canonicalize(artifact_dir).map_err(FsError::at(artifact_dir))?;
        info!(
            scenario = %scenario.id,
            nodes = scenario.nodes.len(),
            services = scenario.service_count(),
            artifact_dir = %artifact_dir.display(),
            "materializing scenario"
        );

        let mut layout = Layout::new(scenario.id.clone());
        for node in &scenario.nodes {
            let layout_node = self.materialize_node(node, &artifact_dir)?;
            layout.services.extend(layout_node.services.iter().cloned());
            layout.nodes.push(layout_node);
        }

        let layout_path = artifact_dir.join(LAYOUT_FILE);
        write_json(&layout_path, &layout)?;
        info!(path = %layout_path.display(), "wrote layout manifest");
        Ok(layout)
    }

    fn materialize_node(&self, node: &Node, artifact_dir: &Path) -> Result<LayoutNode> {
        let work_dir = artifact_dir.join("nodes").join(&node.id);
        fs_util::ensure_dir(&work_dir.join("certs"))?;
        fs_util::ensure_dir(&work_dir.join("configs"))?;
        fs_util::ensure_dir(&work_dir.join("summaries"))?;
        debug!(node = %node.id, work_dir = %work_dir.display(), "created node skeleton");

        let mut state = NodeState::new(&self.config.openbao_url, &self.config.kv_mount);
        let mut layout_node = LayoutNode {
            node_id: node.id.clone(),
            work_dir: work_dir.clone(),
            services: Vec::with_capacity(node.services.len()),
        };

        for service in &node.services {
            let (entry, service_state) = self.materialize_service(&node.id, &work_dir, service)?;
            state
                .services
                .insert(service.service_name.clone(), service_state);
            layout_node.services.push(entry);
        }

        write_json(&work_dir.join(STATE_FILE), &state)?;
        self.write_agent_stub(&work_dir.join("bin"))?;
        info!(node = %node.id, services = node.services.len(), "materialized node");
        Ok(layout_node)
    }

    fn materialize_service(
        &self,
        node_id: &str,
        work_dir: &Path,
        service: &Service,
    ) -> Result<(ServiceLayout, ServiceState)> {
        let name = service.service_name.as_str();
        let hostname = node_id;

        let secret_dir = work_dir.join("secrets").join("services").join(name);
        fs_util::ensure_dir(&secret_dir)?;

        let role_id_path = secret_dir.join("role_id");
        let secret_id_path = secret_dir.join("secret_id");
        let eab_file_path = secret_dir.join("eab.json");
        fs_util::write_private(&role_id_path, format!("{}\n", seed_role_id(name)))?;
        fs_util::write_private(&secret_id_path, format!("{}\n", seed_secret_id(name)))?;
        let eab = json!({ "kid": format!("seed-kid-{name}"), "hmac": format!("seed-hmac-{name}") });
        fs_util::write_private(&eab_file_path, eab.to_string())?;

        let agent_config_path = work_dir.join("configs").join(format!("{name}.toml"));
        let rendered = AgentConfig::for_service(name, hostname, &service.instance_id)
            .to_toml()
            .map_err(|source| MaterializeError::AgentConfig {
                service: name.to_string(),
                source,
            })?;
        fs_util::write_private(&agent_config_path, rendered)?;

        let identity = CertIdentity {
            service_name: name.to_string(),
            hostname: hostname.to_string(),
            instance_id: service.instance_id.clone(),
            domain: self.config.domain.clone(),
        };
        let issued = self
            .issuer
            .issue(&identity, &work_dir.join("certs"))
            .map_err(|source| MaterializeError::Issue {
                service: name.to_string(),
                source,
            })?;
        debug!(service = name, dns_name = %issued.dns_name, "issued stub certificate");

        let entry = ServiceLayout {
            node_id: node_id.to_string(),
            service_name: name.to_string(),
            deploy_type: service.deploy_type.clone(),
            instance_id: service.instance_id.clone(),
            container_name: service.container_name.clone(),
            work_dir: work_dir.to_path_buf(),
            state_path: work_dir.join(STATE_FILE),
            role_id_path,
            secret_id_path,
            eab_file_path,
            agent_config_path,
            cert_path: issued.cert_path,
            key_path: issued.key_path,
            ca_bundle_path: work_dir.join("certs").join(format!("{name}-ca-bundle.pem")),
            summary_json_path: work_dir.join("summaries").join(format!("{name}.json")),
        };

        let role_name = service_role_name(name);
        let state = ServiceState {
            service_name: name.to_string(),
            deploy_type: service.deploy_type.clone(),
            delivery_mode: DeliveryMode::RemoteBootstrap,
            sync_status: SyncStatusSet::pending(),
            hostname: hostname.to_string(),
            domain: self.config.domain.clone(),
            agent_config_path: format!("configs/{name}.toml"),
            cert_path: format!("certs/{name}.crt"),
            key_path: format!("certs/{name}.key"),
            instance_id: service.instance_id.clone(),
            container_name: service.container_name.clone(),
            notes: None,
            approle: AppRoleRecord {
                role_name: role_name.clone(),
                role_id: seed_role_id(name),
                secret_id_path: format!("secrets/services/{name}/secret_id"),
                policy_name: role_name,
            },
        };

        info!(node = node_id, service = name, "materialized service");
        Ok((entry, state))
    }

    fn write_agent_stub(&self, bin_dir: &Path) -> Result<PathBuf> {
        fs_util::ensure_dir(bin_dir)?;
        let stub = bin_dir.join("bootroot-agent");
        match &self.config.agent_stub {
            Some(source) => {
                let bytes = fs::read(source).map_err(FsError::at(source))?;
                fs_util::write_executable(&stub, bytes)?;
            }
            None => fs_util::write_executable(&stub, AGENT_STUB_SCRIPT)?,
        }
        Ok(stub)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| MaterializeError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs_util::write_plain(path, text)?;
    Ok(())
}
