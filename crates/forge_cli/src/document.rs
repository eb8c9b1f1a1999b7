//! Diagram documents read by the CLI.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use forge_core::validation::TopologyNode;
use forge_core::{OutputBinding, PluginRegistry, ResourceInstance};
use forge_hcl::{load_document, PipelineInput, ProjectConfig};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A diagram exported for generation: resources, output bindings, the
/// node tree used for network checks, and project settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramDocument {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub resources: Vec<ResourceInstance>,
    #[serde(default)]
    pub bindings: Vec<OutputBinding>,
    #[serde(default)]
    pub topology: Vec<TopologyNode>,
}

impl DiagramDocument {
    /// Load from YAML or JSON, chosen by file extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let document: Self =
            load_document(path).with_context(|| format!("Failed to read diagram {}", path.display()))?;
        info!(
            "Loaded {} resource(s) and {} binding(s) from {}",
            document.resources.len(),
            document.bindings.len(),
            path.display()
        );
        Ok(document)
    }

    /// Providers named by the resources' type ids, in first-use order.
    pub fn provider_ids(&self) -> Vec<String> {
        self.resources
            .iter()
            .map(|r| r.type_id.provider().to_string())
            .filter(|p| !p.is_empty())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn to_pipeline_input(&self) -> PipelineInput {
        PipelineInput {
            resources: self.resources.clone(),
            project_config: self.project.clone(),
            bindings: self.bindings.clone(),
        }
    }
}

/// Registry with the built-in plugins declared lazily and the requested
/// providers loaded.
pub async fn load_registry(provider_ids: &[String]) -> Result<Arc<PluginRegistry>> {
    let registry = PluginRegistry::new();
    forge_azure::register_lazy(&registry);
    registry
        .load_plugins_for_providers(provider_ids)
        .await
        .context("Plugin loading failed")?;
    registry.finalize();
    Ok(Arc::new(registry))
}
