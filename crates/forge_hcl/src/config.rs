//! Project-level generation settings.

use std::fs;
use std::path::Path;

use forge_core::NamingConvention;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{HclError, HclResult};

/// A project-wide value that is either written literally or exposed as a
/// Terraform variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSetting {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub as_variable: bool,
}

impl ProjectSetting {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            as_variable: false,
        }
    }

    pub fn variable(default: impl Into<String>) -> Self {
        Self {
            value: default.into(),
            as_variable: true,
        }
    }
}

/// Remote state backend, rendered inside the `terraform` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(rename = "type")]
    pub backend_type: String,
    #[serde(default)]
    pub config: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// User settings per provider id.
    #[serde(default)]
    pub provider_configs: IndexMap<String, Map<String, Value>>,
    #[serde(default)]
    pub common_tags: IndexMap<String, String>,
    /// Values written to `terraform.tfvars` for collected variables.
    #[serde(default)]
    pub variable_values: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming_convention: Option<NamingConvention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
    /// Fallback resource group for resources outside a container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ProjectSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ProjectSetting>,
}

impl ProjectConfig {
    /// Load from YAML or JSON, chosen by file extension.
    pub fn from_file(path: &Path) -> HclResult<Self> {
        load_document(path)
    }

    pub fn provider_config(&self, provider_id: &str) -> Map<String, Value> {
        self.provider_configs.get(provider_id).cloned().unwrap_or_default()
    }
}

/// Read a serde document from `path`. `.json` is parsed as JSON; `.yaml`
/// and `.yml` as YAML.
pub fn load_document<T: serde::de::DeserializeOwned>(path: &Path) -> HclResult<T> {
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&content)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        other => Err(HclError::UnsupportedFormat(other.unwrap_or("<none>").to_string())),
    }
}
