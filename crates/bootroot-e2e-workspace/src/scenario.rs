//! Scenario documents
//!
//! A scenario names a set of nodes, each hosting a set of services. It is
//! read once and never mutated; materialization walks it in document order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{MaterializeError, Result};
use crate::layout::read_json;

/// Complete scenario definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Scenario {
    /// Scenario identifier, copied into `layout.json`.
    pub id: String,
    /// Nodes in materialization order.
    pub nodes: Vec<Node>,
}

/// One host in the scenario. The id doubles as hostname and directory name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Node {
    /// Node id; also its hostname and directory name.
    pub id: String,
    /// Services hosted on the node, in materialization order.
    #[serde(default)]
    pub services: Vec<Service>,
}

/// A service the agent bootstraps on a node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Service {
    /// Service name; also names its files.
    pub service_name: String,
    /// How the service is deployed (`daemon`, `docker`, ...). Carried through
    /// to the layout and state files unchanged.
    pub deploy_type: String,
    /// Instance id, first label of the certificate DNS name.
    pub instance_id: String,
    /// Container name for `docker` deployments.
    #[serde(default)]
    pub container_name: Option<String>,
}

impl Scenario {
    /// Read and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let scenario: Scenario = read_json(path)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reject scenarios that would produce ambiguous or unsafe paths.
    pub fn validate(&self) -> Result<()> {
        check_segment("scenario id", &self.id)?;

        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            check_segment("node id", &node.id)?;
            if !node_ids.insert(node.id.as_str()) {
                return Err(MaterializeError::InvalidScenario(format!(
                    "duplicate node id {:?}",
                    node.id
                )));
            }

            let mut names = HashSet::new();
            for service in &node.services {
                check_segment("service name", &service.service_name)?;
                if service.instance_id.trim().is_empty() {
                    return Err(MaterializeError::InvalidScenario(format!(
                        "service {:?} on node {:?} has an empty instance id",
                        service.service_name, node.id
                    )));
                }
                if !names.insert(service.service_name.as_str()) {
                    return Err(MaterializeError::InvalidScenario(format!(
                        "duplicate service {:?} on node {:?}",
                        service.service_name, node.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Total number of services across all nodes.
    pub fn service_count(&self) -> usize {
        self.nodes.iter().map(|node| node.services.len()).sum()
    }
}

// Ids end up as directory and file names.
fn check_segment(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MaterializeError::InvalidScenario(format!(
            "{what} must not be empty"
        )));
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(MaterializeError::InvalidScenario(format!(
            "{what} {value:?} is not a valid path segment"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    const TWO_SERVICES: &str = r#"{
        "id": "scenario-a",
        "nodes": [
            {
                "id": "node-1",
                "services": [
                    {"service_name": "edge-proxy", "deploy_type": "daemon", "instance_id": "001"},
                    {"service_name": "web", "deploy_type": "docker", "instance_id": "002",
                     "container_name": "web-1"}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parses_optional_container_name() {
        let scenario = parse(TWO_SERVICES);
        let services = &scenario.nodes[0].services;
        assert_eq!(services[0].container_name, None);
        assert_eq!(services[1].container_name.as_deref(), Some("web-1"));
        assert_eq!(scenario.service_count(), 2);
        scenario.validate().unwrap();
    }

    #[test]
    fn test_rejects_duplicate_service_on_node() {
        let mut scenario = parse(TWO_SERVICES);
        let dup = scenario.nodes[0].services[0].clone();
        scenario.nodes[0].services.push(dup);
        let err = scenario.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate service"));
    }

    #[test]
    fn test_same_service_on_two_nodes_is_fine() {
        let mut scenario = parse(TWO_SERVICES);
        let mut other = scenario.nodes[0].clone();
        other.id = "node-2".to_string();
        scenario.nodes.push(other);
        scenario.validate().unwrap();
    }

    #[test]
    fn test_rejects_empty_and_traversing_ids() {
        let mut scenario = parse(TWO_SERVICES);
        scenario.id = " ".to_string();
        assert!(scenario.validate().is_err());

        let mut scenario = parse(TWO_SERVICES);
        scenario.nodes[0].id = "../escape".to_string();
        assert!(scenario.validate().is_err());

        let mut scenario = parse(TWO_SERVICES);
        scenario.nodes[0].services[1].service_name = "..".to_string();
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_node() {
        let mut scenario = parse(TWO_SERVICES);
        let dup = scenario.nodes[0].clone();
        scenario.nodes.push(dup);
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, "{\"id\": 3}").unwrap();
        let err = Scenario::load(&path).unwrap_err();
        assert!(matches!(err, MaterializeError::Parse { .. }));
    }
}
