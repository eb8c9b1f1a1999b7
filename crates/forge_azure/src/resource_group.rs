//! Core plugin: the resource group container and the subscription.

use std::sync::Arc;

use forge_core::{
    GenerationResult, HandleDefinition, HandlePosition, HclBlock, HclGenerationContext, HclGenerator, InfraPlugin,
    NamingConstraints, PaletteCategory, PropertyFieldType, PropertySchema, PropertyValidation, ResourceInstance,
    ResourceSchema, ResourceTypeRegistration,
};
use serde_json::json;

use crate::common::{name_expression, property_expression};
use crate::provider::{AzurermProvider, PROVIDER_ID};
use crate::subscription::{self, SubscriptionGenerator};
use crate::types;

pub const DEFAULT_LOCATION: &str = "eastus";

const LOCATIONS: [&str; 10] = [
    "eastus",
    "eastus2",
    "westus",
    "westus2",
    "centralus",
    "northeurope",
    "westeurope",
    "uksouth",
    "southeastasia",
    "australiaeast",
];

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(types::RESOURCE_GROUP, "Resource Group", "azurerm_resource_group")
        .with_description("Logical container for related resources")
        .with_tags()
        .container()
        .with_naming("rg", NamingConstraints::default().with_max_length(90))
        .property(
            PropertySchema::new("name", "Name", PropertyFieldType::String)
                .required()
                .with_validation(
                    PropertyValidation::length(1, 90)
                        .with_pattern(r"^[-\w._()]+$", "Alphanumerics, underscores, hyphens, periods, and parentheses"),
                ),
        )
        .property(
            PropertySchema::new("location", "Location", PropertyFieldType::Select)
                .required()
                .with_default(json!(DEFAULT_LOCATION))
                .with_options(LOCATIONS),
        )
        .handle(HandleDefinition::source("resources-out", HandlePosition::Bottom, "Resources"))
}

pub struct ResourceGroupGenerator;

impl HclGenerator for ResourceGroupGenerator {
    fn generate(
        &self,
        resource: &ResourceInstance,
        context: &dyn HclGenerationContext,
    ) -> GenerationResult<Vec<HclBlock>> {
        let content = [
            format!("resource \"azurerm_resource_group\" \"{}\" {{", resource.terraform_name),
            format!("  name     = {}", name_expression(context, resource)),
            format!(
                "  location = {}",
                property_expression(context, resource, "location", json!(DEFAULT_LOCATION))
            ),
            String::new(),
            "  tags = local.common_tags".to_string(),
            "}".to_string(),
        ]
        .join("\n");

        Ok(vec![HclBlock::resource(
            "azurerm_resource_group",
            &resource.terraform_name,
            content,
        )])
    }
}

pub fn plugin() -> InfraPlugin {
    InfraPlugin::new("azurerm-core", "Azure Core", env!("CARGO_PKG_VERSION"), PROVIDER_ID)
        .with_provider_config(Arc::new(AzurermProvider))
        .resource_type(ResourceTypeRegistration::new(subscription::schema(), SubscriptionGenerator))
        .resource_type(ResourceTypeRegistration::new(schema(), ResourceGroupGenerator))
        .palette_category(PaletteCategory::new("core", "Core", 0))
}
