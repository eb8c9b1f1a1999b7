//! Diagram validation.
//!
//! Every check here reports problems as values. Only `Error` severity
//! blocks generation; warnings are surfaced to the user and nothing more.

mod diagram;
mod network;
mod resource;

pub use diagram::{validate_diagram, DiagramError, DiagramValidationResult};
pub use network::{
    topology_from_resources, validate_network_topology, NetworkTopologyRules, TopologyError, TopologyNode,
};
pub use resource::{validate_required_references, validate_resource_properties};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem found on one property of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub property_key: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationError {
    pub fn error(property_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_key: property_key.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(property_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_key: property_key.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
