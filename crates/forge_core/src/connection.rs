//! Connection rules between resource handles.

use serde::{Deserialize, Serialize};

use crate::schema::ResourceTypeId;

/// Which end of an edge holds the reference property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSide {
    Source,
    Target,
}

/// Reference write-back implied by a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatesReference {
    pub side: ReferenceSide,
    pub property_key: String,
}

/// Marks a rule as an output binding that generates intermediate HCL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputBindingRule {
    pub source_attribute: String,
}

/// Declares that an edge `(source_type, source_handle) -> (target_type, target_handle)` is legal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRule {
    pub source_type: ResourceTypeId,
    pub source_handle: String,
    pub target_type: ResourceTypeId,
    pub target_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creates_reference: Option<CreatesReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_binding: Option<OutputBindingRule>,
}

impl ConnectionRule {
    pub fn new(
        source_type: impl Into<ResourceTypeId>,
        source_handle: impl Into<String>,
        target_type: impl Into<ResourceTypeId>,
        target_handle: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            source_handle: source_handle.into(),
            target_type: target_type.into(),
            target_handle: target_handle.into(),
            creates_reference: None,
            label: None,
            output_binding: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn creates_reference(mut self, side: ReferenceSide, property_key: impl Into<String>) -> Self {
        self.creates_reference = Some(CreatesReference {
            side,
            property_key: property_key.into(),
        });
        self
    }

    pub fn with_output_binding(mut self, source_attribute: impl Into<String>) -> Self {
        self.output_binding = Some(OutputBindingRule {
            source_attribute: source_attribute.into(),
        });
        self
    }

    pub fn matches(&self, source_type: &ResourceTypeId, source_handle: &str, target_type: &ResourceTypeId, target_handle: &str) -> bool {
        &self.source_type == source_type
            && self.source_handle == source_handle
            && &self.target_type == target_type
            && self.target_handle == target_handle
    }
}
