//! Resource instances: the generation-facing projection of diagram nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::ResourceTypeId;

/// Reference key set by the diagram layer for resources placed inside a
/// resource group container.
pub const RESOURCE_GROUP_REFERENCE: &str = "_resource_group";

/// Prefix of cost estimation hints that never reach generators.
pub const COST_PROPERTY_PREFIX: &str = "_cost_";

/// How a property value is emitted into HCL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableMode {
    #[default]
    Literal,
    Variable,
}

/// One diagram node, immutable for the duration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInstance {
    pub instance_id: String,
    pub type_id: ResourceTypeId,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Property key to target instance id.
    #[serde(default)]
    pub references: BTreeMap<String, String>,
    pub terraform_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variable_overrides: BTreeMap<String, VariableMode>,
}

impl ResourceInstance {
    pub fn new(
        instance_id: impl Into<String>,
        type_id: impl Into<ResourceTypeId>,
        terraform_name: impl Into<String>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            type_id: type_id.into(),
            properties: Map::new(),
            references: BTreeMap::new(),
            terraform_name: terraform_name.into(),
            variable_overrides: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_reference(mut self, key: impl Into<String>, target: impl Into<String>) -> Self {
        self.references.insert(key.into(), target.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>) -> Self {
        self.variable_overrides.insert(key.into(), VariableMode::Variable);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// String items of an array property; non-string items are skipped.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        self.properties
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn reference(&self, key: &str) -> Option<&str> {
        self.references.get(key).map(String::as_str)
    }

    pub fn variable_mode(&self, key: &str) -> VariableMode {
        self.variable_overrides.get(key).copied().unwrap_or_default()
    }

    /// Copy of this instance without `_cost_*` estimation hints.
    pub fn without_cost_hints(&self) -> Self {
        let mut clean = self.clone();
        clean.properties.retain(|k, _| !k.starts_with(COST_PROPERTY_PREFIX));
        clean
    }
}
