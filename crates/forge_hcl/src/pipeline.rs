//! HCL generation pipeline.
//!
//! Turns resource instances plus project settings into Terraform files.
//! A run is all-or-nothing: any error aborts it and no files are produced.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use forge_core::hcl::{format_hcl_key, quote};
use forge_core::validation::{
    topology_from_resources, validate_diagram, validate_network_topology, DiagramValidationResult,
    NetworkTopologyRules, TopologyError, TopologyNode,
};
use forge_core::{
    BlockType, HclBlock, HclGenerationContext, OutputBinding, PluginRegistry, PluginRegistryReader, RegistryError,
    ResourceInstance, TerraformVariable,
};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::block_builder::{GeneratedFiles, HclBlockBuilder};
use crate::config::ProjectConfig;
use crate::context::PipelineContext;
use crate::dependency_graph::DependencyGraph;
use crate::error::{HclError, HclResult};
use crate::provider_config::{ProviderConfigBuilder, DEFAULT_TERRAFORM_VERSION};

/// Canvas node whose `subscription_id` configures the `azurerm` provider.
const SUBSCRIPTION_TYPE: &str = "azurerm/core/subscription";
const SUBSCRIPTION_PROVIDER: &str = "azurerm";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInput {
    pub resources: Vec<ResourceInstance>,
    #[serde(default)]
    pub project_config: ProjectConfig,
    #[serde(default)]
    pub bindings: Vec<OutputBinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub files: GeneratedFiles,
    pub collected_variables: Vec<TerraformVariable>,
}

/// Combined diagram and network findings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub diagram: DiagramValidationResult,
    pub topology: Vec<TopologyError>,
}

impl ValidationReport {
    /// Number of error-severity findings.
    pub fn blocking_count(&self) -> usize {
        let diagram = self.diagram.errors.iter().flat_map(|e| &e.errors);
        let topology = self.topology.iter().flat_map(|e| &e.errors);
        diagram.chain(topology).filter(|e| e.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        let diagram = self.diagram.errors.iter().flat_map(|e| &e.errors);
        let topology = self.topology.iter().flat_map(|e| &e.errors);
        diagram.chain(topology).filter(|e| !e.is_error()).count()
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking_count() > 0
    }
}

/// Main generation orchestrator.
pub struct HclPipeline {
    registry: Arc<PluginRegistry>,
    topology_rules: NetworkTopologyRules,
}

impl HclPipeline {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            topology_rules: NetworkTopologyRules::default(),
        }
    }

    pub fn with_topology_rules(mut self, rules: NetworkTopologyRules) -> Self {
        self.topology_rules = rules;
        self
    }

    /// Run diagram and network validation without generating anything.
    ///
    /// An empty `topology` means the caller has no canvas placement; the
    /// network checks then run on nodes derived from the resources'
    /// subnet-to-network references.
    pub fn validate(&self, resources: &[ResourceInstance], topology: &[TopologyNode]) -> ValidationReport {
        let derived;
        let nodes = if topology.is_empty() {
            derived = topology_from_resources(resources, &self.topology_rules);
            &derived
        } else {
            topology
        };
        let report = ValidationReport {
            diagram: validate_diagram(resources, self.registry.as_ref()),
            topology: validate_network_topology(nodes, &self.topology_rules),
        };
        info!(
            "Validation finished: {} error(s), {} warning(s)",
            report.blocking_count(),
            report.warning_count()
        );
        report
    }

    /// Validate, then generate. Only error-severity findings stop generation;
    /// the report is returned alongside the result so warnings can be shown.
    pub fn validate_and_generate(
        &self,
        input: &PipelineInput,
        topology: &[TopologyNode],
    ) -> HclResult<(PipelineResult, ValidationReport)> {
        let report = self.validate(&input.resources, topology);
        if report.is_blocking() {
            return Err(HclError::ValidationFailed(Box::new(report)));
        }
        let result = self.generate(input)?;
        Ok((result, report))
    }

    pub fn generate(&self, input: &PipelineInput) -> HclResult<PipelineResult> {
        let project = &input.project_config;
        info!("Generating HCL for {} resource(s)", input.resources.len());

        let subscription_id = input
            .resources
            .iter()
            .find(|r| r.type_id.as_str() == SUBSCRIPTION_TYPE)
            .and_then(|r| r.str_property("subscription_id"))
            .filter(|id| !id.is_empty());

        // Resolve schemas; virtual types produce no Terraform resource.
        let mut real = Vec::new();
        for resource in &input.resources {
            let schema = self
                .registry
                .get_resource_schema(&resource.type_id)
                .ok_or_else(|| RegistryError::UnknownResourceType(resource.type_id.clone()))?;
            if schema.is_virtual() {
                debug!("Skipping virtual resource {}", resource.instance_id);
                continue;
            }
            let generator = self.registry.get_hcl_generator(&resource.type_id)?;
            real.push((resource, schema, generator));
        }

        let mut addresses = HashMap::new();
        for (resource, schema, generator) in &real {
            let terraform_type = generator
                .resolve_terraform_type(&resource.properties)
                .unwrap_or_else(|| schema.terraform_type.clone());
            addresses.insert(
                resource.instance_id.clone(),
                format!("{}.{}", terraform_type, resource.terraform_name),
            );
        }

        let resources: IndexMap<String, ResourceInstance> = input
            .resources
            .iter()
            .map(|r| (r.instance_id.clone(), r.without_cost_hints()))
            .collect();
        let context = PipelineContext::new(resources, addresses, project);
        context.seed_project_variables();

        let mut blocks: Vec<HclBlock> = Vec::new();
        for (resource, _, generator) in &real {
            let clean = resource.without_cost_hints();
            debug!("Generating {} ({})", clean.instance_id, clean.type_id);
            blocks.extend(generator.generate(&clean, &context)?);
        }

        for binding in &input.bindings {
            let (Some(source), Some(target)) = (
                context.get_resource(&binding.source_instance_id),
                context.get_resource(&binding.target_instance_id),
            ) else {
                warn!(
                    "Skipping binding {} -> {}: instance not found",
                    binding.source_instance_id, binding.target_instance_id
                );
                continue;
            };
            let Some(generator) = self.registry.get_binding_generator(&source.type_id, &target.type_id) else {
                warn!("No binding generator for {} -> {}", source.type_id, target.type_id);
                continue;
            };
            blocks.extend(generator.generate(source, target, &context, &binding.source_attribute)?);
        }

        let sorted = DependencyGraph::new(dedupe_data_sources(blocks)).topological_sort()?;

        let mut providers = ProviderConfigBuilder::new();
        let active: IndexSet<&str> = real.iter().map(|(_, schema, _)| schema.provider.as_str()).collect();
        for provider_id in active {
            match self.registry.get_provider_config(provider_id) {
                Some(config) => {
                    let mut user_config = project.provider_config(provider_id);
                    if let Some(id) = subscription_id.filter(|_| provider_id == SUBSCRIPTION_PROVIDER) {
                        user_config.insert("subscription_id".to_string(), Value::String(id.to_string()));
                    }
                    providers.add_provider(config, user_config);
                }
                None => warn!("No provider config registered for {}", provider_id),
            }
        }

        let (variables, outputs) = context.into_collectors();
        let mut files = HclBlockBuilder::new().assemble(
            &sorted,
            providers.generate_terraform_block(DEFAULT_TERRAFORM_VERSION, project.backend.as_ref()),
            providers.generate_provider_blocks(),
            variables.generate_variables_hcl(),
            outputs.generate_outputs_hcl(),
            // Never empty: generators emit `tags = local.common_tags` without checking.
            generate_locals(project),
        );

        let collected_variables = variables.get_all();
        let tfvars = generate_tfvars(&collected_variables, project);
        if !tfvars.trim().is_empty() {
            files.terraform_tfvars = Some(tfvars);
        }

        info!(
            "Generated {} block(s), {} variable(s)",
            sorted.len(),
            collected_variables.len()
        );
        Ok(PipelineResult {
            files,
            collected_variables,
        })
    }
}

/// Several generators may read the same data source; keep the first.
fn dedupe_data_sources(blocks: Vec<HclBlock>) -> Vec<HclBlock> {
    let mut seen = HashSet::new();
    blocks
        .into_iter()
        .filter(|b| b.block_type != BlockType::Data || b.address().map_or(true, |address| seen.insert(address)))
        .collect()
}

/// `local.common_tags` is always defined so generators can reference it
/// unconditionally.
fn generate_locals(project: &ProjectConfig) -> String {
    if project.common_tags.is_empty() {
        return "locals {\n  common_tags = {}\n}".to_string();
    }
    let entries = project
        .common_tags
        .iter()
        .map(|(k, v)| format!("    {} = {}", format_hcl_key(k), quote(v)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("locals {{\n  common_tags = {{\n{}\n  }}\n}}", entries)
}

/// `name = "value"` lines for collected variables that have a project value.
fn generate_tfvars(variables: &[TerraformVariable], project: &ProjectConfig) -> String {
    variables
        .iter()
        .filter_map(|v| {
            project
                .variable_values
                .get(&v.name)
                .filter(|value| !value.is_empty())
                .map(|value| format!("{} = {}", v.name, quote(value)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
