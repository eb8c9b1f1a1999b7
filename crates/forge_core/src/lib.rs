//! # forge_core
//!
//! Resource model, plugin registry and diagram validation for terraforge.
//!
//! This crate holds everything a plugin needs to describe resource types
//! and everything the generator needs to check a diagram before it turns
//! into Terraform.
//!
//! ## Features
//!
//! - Collision-checked plugin registry with lazy, provider-scoped loading
//! - Connection rules and edge validation, including computed-output bindings
//! - Property, reference and network topology validation
//! - IPv4 CIDR arithmetic and subnet allocation
//! - Naming convention templates with slug extraction
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_core::{cidr, PluginRegistry};
//!
//! # async fn run(registry: PluginRegistry) -> anyhow::Result<()> {
//! registry.load_plugins_for_providers(&["azurerm"]).await?;
//! let edges = registry.build_edge_validator();
//!
//! let next = cidr::next_available_cidr("10.0.0.0/16", &["10.0.0.0/24"], 24);
//! assert_eq!(next.as_deref(), Some("10.0.1.0/24"));
//! # let _ = edges;
//! # Ok(())
//! # }
//! ```

pub mod cidr;
pub mod connection;
pub mod edge_rules;
pub mod error;
pub mod hcl;
pub mod instance;
pub mod naming;
pub mod plugin;
pub mod registry;
pub mod schema;
pub mod validation;

pub use connection::{ConnectionRule, CreatesReference, OutputBindingRule, ReferenceSide};
pub use edge_rules::{EdgeRuleValidator, EdgeValidationResult, OutputAcceptingHandle, ReferenceWrite, OUTPUT_HANDLE_PREFIX};
pub use error::{GenerationError, GenerationResult, RegistryError, RegistryResult};
pub use hcl::{
    BindingHclGenerator, BlockType, HclBlock, HclGenerationContext, HclGenerator, OutputBinding,
    PropertyExpressionOptions, TerraformOutput, TerraformVariable,
};
pub use instance::{ResourceInstance, VariableMode, COST_PROPERTY_PREFIX, RESOURCE_GROUP_REFERENCE};
pub use naming::{NamingConstraints, NamingConvention, NamingTokens};
pub use plugin::{
    IconDefinition, InfraPlugin, PaletteCategory, PluginLoader, PluginRegistryReader, ProviderConfig, ProviderId,
    ResourceTypeRegistration,
};
pub use registry::{LoadState, PluginRegistry, RegistryEvent};
pub use schema::{
    HandleDefinition, HandleKind, HandlePosition, PropertyFieldType, PropertySchema, PropertyValidation,
    ResourceSchema, ResourceTypeId,
};
pub use validation::{DiagramValidationResult, Severity, TopologyNode, ValidationError};
