//! # forge_hcl
//!
//! Terraform HCL generation for terraforge.
//!
//! Takes resource instances from a diagram, runs each through the generator
//! its plugin registered, orders the resulting blocks by dependency and
//! assembles the files of a Terraform root module.
//!
//! ## Features
//!
//! - Literal or variable-backed property values per resource
//! - Project-wide resource group and location fallbacks
//! - Output bindings between resources
//! - Dependency-ordered `main.tf` with cycle detection
//! - `terraform.tf`, `providers.tf`, `variables.tf`, `outputs.tf`, `locals.tf`
//!   and an optional `terraform.tfvars`
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use forge_core::PluginRegistry;
//! use forge_hcl::{HclPipeline, PipelineInput};
//!
//! # fn run(registry: Arc<PluginRegistry>, input: PipelineInput) -> anyhow::Result<()> {
//! let pipeline = HclPipeline::new(registry);
//! let result = pipeline.generate(&input)?;
//! result.files.write_to(Path::new("./infra"))?;
//! # Ok(())
//! # }
//! ```

pub mod block_builder;
pub mod collector;
pub mod config;
pub mod context;
pub mod dependency_graph;
pub mod error;
pub mod pipeline;
pub mod provider_config;

pub use block_builder::{GeneratedFiles, HclBlockBuilder};
pub use collector::{OutputCollector, VariableCollector};
pub use config::{load_document, BackendConfig, ProjectConfig, ProjectSetting};
pub use context::PipelineContext;
pub use dependency_graph::DependencyGraph;
pub use error::{HclError, HclResult};
pub use pipeline::{HclPipeline, PipelineInput, PipelineResult, ValidationReport};
pub use provider_config::{ProviderConfigBuilder, DEFAULT_TERRAFORM_VERSION};
