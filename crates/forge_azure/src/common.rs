//! Helpers shared by the azurerm generators.

use forge_core::{HclGenerationContext, PropertyExpressionOptions, ResourceInstance, RESOURCE_GROUP_REFERENCE};
use serde_json::Value;

/// Expression for `key`, falling back to `default` when the property is unset.
pub(crate) fn property_expression(
    context: &dyn HclGenerationContext,
    resource: &ResourceInstance,
    key: &str,
    default: Value,
) -> String {
    let value = resource.property(key).cloned().unwrap_or(default);
    context.get_property_expression(resource, key, &value, &PropertyExpressionOptions::default())
}

/// Expression for the `name` argument. Unnamed resources use their
/// Terraform name.
pub(crate) fn name_expression(context: &dyn HclGenerationContext, resource: &ResourceInstance) -> String {
    property_expression(context, resource, "name", Value::String(resource.terraform_name.clone()))
}

/// Address of the resource group container, when there is one.
pub(crate) fn container_dependencies(context: &dyn HclGenerationContext, resource: &ResourceInstance) -> Vec<String> {
    resource
        .reference(RESOURCE_GROUP_REFERENCE)
        .and_then(|id| context.get_terraform_address(id))
        .into_iter()
        .collect()
}
