//! Subscription container.
//!
//! A subscription produces no Terraform resource. The pipeline reads its
//! `subscription_id` and hands it to the `azurerm` provider block.

use forge_core::{
    GenerationResult, HclBlock, HclGenerationContext, HclGenerator, PropertyFieldType, PropertySchema,
    PropertyValidation, ResourceInstance, ResourceSchema,
};

use crate::provider::UUID_PATTERN;
use crate::types;

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(types::SUBSCRIPTION, "Subscription", "_subscription")
        .with_description("Top-level billing and access boundary")
        .container()
        .property(PropertySchema::new("display_name", "Display Name", PropertyFieldType::String).required())
        .property(
            PropertySchema::new("subscription_id", "Subscription ID", PropertyFieldType::String)
                .required()
                .with_validation(PropertyValidation::default().with_pattern(UUID_PATTERN, "Must be a valid UUID")),
        )
}

pub struct SubscriptionGenerator;

impl HclGenerator for SubscriptionGenerator {
    fn generate(&self, _: &ResourceInstance, _: &dyn HclGenerationContext) -> GenerationResult<Vec<HclBlock>> {
        Ok(Vec::new())
    }
}
