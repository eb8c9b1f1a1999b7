//! `azurerm` provider definition.

use forge_core::hcl::quote;
use forge_core::{PropertyFieldType, PropertySchema, PropertyValidation, ProviderConfig};
use serde_json::{Map, Value};

pub const PROVIDER_ID: &str = "azurerm";

pub(crate) const UUID_PATTERN: &str = "^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

#[derive(Debug, Clone, Copy, Default)]
pub struct AzurermProvider;

impl ProviderConfig for AzurermProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Azure Resource Manager"
    }

    fn source(&self) -> &str {
        "hashicorp/azurerm"
    }

    fn version(&self) -> &str {
        "~> 4.0"
    }

    fn config_schema(&self) -> Vec<PropertySchema> {
        vec![PropertySchema::new("subscription_id", "Subscription ID", PropertyFieldType::String)
            .required()
            .with_description("Azure subscription ID")
            .with_validation(PropertyValidation::default().with_pattern(UUID_PATTERN, "Must be a valid UUID"))]
    }

    fn default_config(&self) -> Map<String, Value> {
        let mut config = Map::new();
        config.insert("subscription_id".to_string(), Value::String(String::new()));
        config
    }

    fn generate_provider_block(&self, config: &Map<String, Value>) -> String {
        let mut lines = vec!["provider \"azurerm\" {".to_string()];

        if let Some(subscription) = config.get("subscription_id").and_then(Value::as_str) {
            if subscription.starts_with("var.") {
                lines.push(format!("  subscription_id = {}", subscription));
            } else if !subscription.is_empty() {
                lines.push(format!("  subscription_id = {}", quote(subscription)));
            }
        }

        lines.push("  features {}".to_string());
        lines.push("}".to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("subscription_id".to_string(), value);
        map
    }

    #[test]
    fn test_provider_block_without_subscription() {
        assert_eq!(
            AzurermProvider.generate_provider_block(&Map::new()),
            "provider \"azurerm\" {\n  features {}\n}"
        );
        assert_eq!(
            AzurermProvider.generate_provider_block(&AzurermProvider.default_config()),
            "provider \"azurerm\" {\n  features {}\n}"
        );
    }

    #[test]
    fn test_subscription_literal_and_variable() {
        let literal = AzurermProvider.generate_provider_block(&config(json!("0000-1111")));
        assert!(literal.contains("  subscription_id = \"0000-1111\""));

        let variable = AzurermProvider.generate_provider_block(&config(json!("var.subscription_id")));
        assert!(variable.contains("  subscription_id = var.subscription_id\n"));
    }

    #[test]
    fn test_required_provider_entry() {
        assert_eq!(
            AzurermProvider.generate_required_provider(),
            "    azurerm = {\n      source  = \"hashicorp/azurerm\"\n      version = \"~> 4.0\"\n    }"
        );
    }
}
