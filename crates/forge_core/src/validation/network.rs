//! Network topology checks: subnets inside their parent network, and no
//! overlap between sibling subnets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ValidationError;
use crate::cidr::{cidr_contains, cidrs_overlap, is_valid_cidr};
use crate::instance::ResourceInstance;
use crate::schema::ResourceTypeId;

/// Minimal node shape needed for topology checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    pub id: String,
    pub type_id: ResourceTypeId,
    /// Container node this node is placed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TopologyNode {
    /// First CIDR of a list-valued property. Later entries are not inspected.
    fn first_cidr(&self, key: &str) -> Option<&str> {
        match self.properties.get(key)? {
            Value::Array(items) => items.first()?.as_str(),
            _ => None,
        }
    }

    fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Which node type and property keys describe networks and subnets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTopologyRules {
    pub subnet_type: ResourceTypeId,
    pub network_cidr_key: String,
    pub subnet_cidr_key: String,
    /// Reference key tying a subnet to its network when no canvas
    /// placement is available.
    #[serde(default = "default_parent_reference")]
    pub parent_reference_key: String,
}

fn default_parent_reference() -> String {
    "virtual_network_name".to_string()
}

impl Default for NetworkTopologyRules {
    fn default() -> Self {
        Self {
            subnet_type: ResourceTypeId::new("azurerm/networking/subnet"),
            network_cidr_key: "address_space".to_string(),
            subnet_cidr_key: "address_prefixes".to_string(),
            parent_reference_key: default_parent_reference(),
        }
    }
}

/// Topology nodes derived from resource instances alone. Subnets hang off
/// the network named by their parent reference.
pub fn topology_from_resources(resources: &[ResourceInstance], rules: &NetworkTopologyRules) -> Vec<TopologyNode> {
    resources
        .iter()
        .map(|resource| TopologyNode {
            id: resource.instance_id.clone(),
            type_id: resource.type_id.clone(),
            parent_id: (resource.type_id == rules.subnet_type)
                .then(|| resource.reference(&rules.parent_reference_key))
                .flatten()
                .map(str::to_string),
            properties: resource.properties.clone(),
            label: resource.str_property("name").map(str::to_string),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyError {
    pub instance_id: String,
    pub errors: Vec<ValidationError>,
}

/// Check every subnet against its parent network and its siblings.
///
/// A subnet outside its parent's address space is an error. Overlap with a
/// sibling is a warning, reported once per subnet for the first offending
/// sibling. Subnets without a parent or without a valid CIDR are ignored.
pub fn validate_network_topology(nodes: &[TopologyNode], rules: &NetworkTopologyRules) -> Vec<TopologyError> {
    let mut subnets_by_network: IndexMap<&str, Vec<&TopologyNode>> = IndexMap::new();
    for node in nodes.iter().filter(|n| n.type_id == rules.subnet_type) {
        if let Some(parent) = node.parent_id.as_deref() {
            subnets_by_network.entry(parent).or_default().push(node);
        }
    }

    let mut results = Vec::new();

    for (network_id, subnets) in &subnets_by_network {
        let Some(network) = nodes.iter().find(|n| n.id == *network_id) else {
            continue;
        };
        let network_cidr = network
            .first_cidr(&rules.network_cidr_key)
            .filter(|c| is_valid_cidr(c));

        for subnet in subnets {
            let Some(subnet_cidr) = subnet.first_cidr(&rules.subnet_cidr_key).filter(|c| is_valid_cidr(c)) else {
                continue;
            };

            let mut errors = Vec::new();

            if let Some(network_cidr) = network_cidr {
                if !cidr_contains(network_cidr, subnet_cidr) {
                    errors.push(ValidationError::error(
                        &rules.subnet_cidr_key,
                        format!(
                            "Subnet CIDR {} is outside VNet address space {}",
                            subnet_cidr, network_cidr
                        ),
                    ));
                }
            }

            let overlapping = subnets
                .iter()
                .filter(|sibling| sibling.id != subnet.id)
                .find_map(|sibling| {
                    let cidr = sibling.first_cidr(&rules.subnet_cidr_key)?;
                    (is_valid_cidr(cidr) && cidrs_overlap(subnet_cidr, cidr)).then_some((sibling, cidr))
                });
            if let Some((sibling, sibling_cidr)) = overlapping {
                errors.push(ValidationError::warning(
                    &rules.subnet_cidr_key,
                    format!(
                        "Subnet CIDR {} overlaps with sibling subnet {} ({})",
                        subnet_cidr,
                        sibling.display_name(),
                        sibling_cidr
                    ),
                ));
            }

            if !errors.is_empty() {
                results.push(TopologyError {
                    instance_id: subnet.id.clone(),
                    errors,
                });
            }
        }
    }

    results
}
