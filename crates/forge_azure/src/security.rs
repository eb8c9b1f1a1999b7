//! Security plugin: key vaults and secrets bound from other resources' outputs.

use forge_core::{
    BindingHclGenerator, GenerationResult, HandleDefinition, HandlePosition, HclBlock, HclGenerationContext,
    HclGenerator, InfraPlugin, NamingConstraints, PaletteCategory, PluginRegistryReader, PropertyFieldType,
    PropertySchema, PropertyValidation, ResourceInstance, ResourceSchema, ResourceTypeId, ResourceTypeRegistration,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::common::{container_dependencies, name_expression, property_expression};
use crate::provider::PROVIDER_ID;
use crate::types;

const CLIENT_CONFIG_ADDRESS: &str = "data.azurerm_client_config.current";
const DEFAULT_RETENTION_DAYS: u64 = 90;

pub fn key_vault_schema() -> ResourceSchema {
    ResourceSchema::new(types::KEY_VAULT, "Key Vault", "azurerm_key_vault")
        .with_description("Secrets, keys and certificates")
        .with_tags()
        .in_resource_group()
        .child_of(types::RESOURCE_GROUP)
        .with_naming("kv", NamingConstraints::lowercase().with_max_length(24))
        .property(
            PropertySchema::new("name", "Name", PropertyFieldType::String)
                .required()
                .with_validation(PropertyValidation::length(3, 24).with_pattern(
                    "^[a-zA-Z][a-zA-Z0-9-]*[a-zA-Z0-9]$",
                    "Must start with a letter, end with alphanumeric, and contain only letters, numbers, and hyphens",
                )),
        )
        .property(
            PropertySchema::new("sku_name", "SKU", PropertyFieldType::Select)
                .required()
                .with_default(json!("standard"))
                .with_options(["standard", "premium"]),
        )
        .property(
            PropertySchema::new("soft_delete_retention_days", "Soft Delete Retention (days)", PropertyFieldType::Number)
                .with_default(json!(DEFAULT_RETENTION_DAYS))
                .with_validation(PropertyValidation::range(7.0, 90.0)),
        )
        .property(
            PropertySchema::new("purge_protection_enabled", "Purge Protection", PropertyFieldType::Boolean)
                .with_default(json!(false))
                .with_description("Once enabled, cannot be disabled"),
        )
        .handle(HandleDefinition::target("secret-in", HandlePosition::Left, "Secret").accepting_outputs())
}

pub struct KeyVaultGenerator;

impl HclGenerator for KeyVaultGenerator {
    fn generate(
        &self,
        resource: &ResourceInstance,
        context: &dyn HclGenerationContext,
    ) -> GenerationResult<Vec<HclBlock>> {
        let mut lines = vec![
            format!("resource \"azurerm_key_vault\" \"{}\" {{", resource.terraform_name),
            format!("  name                = {}", name_expression(context, resource)),
            format!("  resource_group_name = {}", context.get_resource_group_expression(resource)?),
            format!("  location            = {}", context.get_location_expression(resource)?),
            format!(
                "  sku_name            = {}",
                property_expression(context, resource, "sku_name", json!("standard"))
            ),
            format!("  tenant_id           = {}.tenant_id", CLIENT_CONFIG_ADDRESS),
        ];

        let retention = resource.property("soft_delete_retention_days").and_then(Value::as_u64);
        if let Some(days) = retention.filter(|d| *d != DEFAULT_RETENTION_DAYS) {
            lines.push(format!("  soft_delete_retention_days = {}", days));
        }
        if resource.property("purge_protection_enabled").and_then(Value::as_bool) == Some(true) {
            lines.push("  purge_protection_enabled   = true".to_string());
        }

        lines.push(String::new());
        lines.push("  tags = local.common_tags".to_string());
        lines.push("}".to_string());

        let client_config = HclBlock::data(
            "azurerm_client_config",
            "current",
            "data \"azurerm_client_config\" \"current\" {}",
        );
        let vault = HclBlock::resource("azurerm_key_vault", &resource.terraform_name, lines.join("\n"))
            .depends_on(std::iter::once(CLIENT_CONFIG_ADDRESS.to_string()).chain(container_dependencies(context, resource)));

        Ok(vec![client_config, vault])
    }
}

/// Stores any resource's output attribute as a key vault secret.
pub struct KeyVaultSecretBinding {
    target: ResourceTypeId,
}

impl Default for KeyVaultSecretBinding {
    fn default() -> Self {
        Self {
            target: ResourceTypeId::new(types::KEY_VAULT),
        }
    }
}

impl BindingHclGenerator for KeyVaultSecretBinding {
    fn source_type(&self) -> Option<&ResourceTypeId> {
        None
    }

    fn target_type(&self) -> &ResourceTypeId {
        &self.target
    }

    fn generate(
        &self,
        source: &ResourceInstance,
        target: &ResourceInstance,
        context: &dyn HclGenerationContext,
        source_attribute: &str,
    ) -> GenerationResult<Vec<HclBlock>> {
        let terraform_name = format!("{}_{}", source.terraform_name, source_attribute);
        let base_name = source
            .str_property("name")
            .filter(|n| !n.is_empty())
            .unwrap_or(&source.terraform_name);
        let secret_name = format!("{}-{}", base_name, source_attribute.replace('_', "-"));

        let content = [
            format!("resource \"azurerm_key_vault_secret\" \"{}\" {{", terraform_name),
            format!("  name         = {}", forge_core::hcl::quote(&secret_name)),
            format!(
                "  value        = {}",
                context.get_attribute_reference(&source.instance_id, source_attribute)?
            ),
            format!(
                "  key_vault_id = {}",
                context.get_attribute_reference(&target.instance_id, "id")?
            ),
            "}".to_string(),
        ]
        .join("\n");

        let depends_on = [&source.instance_id, &target.instance_id]
            .into_iter()
            .filter_map(|id| context.get_terraform_address(id));

        Ok(vec![
            HclBlock::resource("azurerm_key_vault_secret", terraform_name, content).depends_on(depends_on)
        ])
    }
}

pub fn plugin() -> InfraPlugin {
    InfraPlugin::new("azurerm-security", "Azure Security", env!("CARGO_PKG_VERSION"), PROVIDER_ID)
        .resource_type(ResourceTypeRegistration::new(key_vault_schema(), KeyVaultGenerator))
        .binding_generator(KeyVaultSecretBinding::default())
        .palette_category(PaletteCategory::new("security", "Security", 20))
        .on_all_plugins_registered(|registry: &dyn PluginRegistryReader| {
            debug!(
                "Key vault secrets can bind outputs of {} resource type(s)",
                registry.get_resource_type_ids().len()
            );
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::validation::validate_resource_properties;

    #[test]
    fn test_key_vault_name_rules() {
        let schema = key_vault_schema();
        let mut props = serde_json::Map::new();
        props.insert("name".into(), json!("kv"));
        props.insert("sku_name".into(), json!("standard"));
        props.insert("soft_delete_retention_days".into(), json!(3));

        let errors = validate_resource_properties(&schema, &props, &Default::default());
        let keys: Vec<&str> = errors.iter().map(|e| e.property_key.as_str()).collect();
        assert_eq!(keys, vec!["name", "soft_delete_retention_days"]);
    }

    #[test]
    fn test_secret_handle_accepts_outputs() {
        let schema = key_vault_schema();
        assert!(schema.handles.iter().any(|h| h.id == "secret-in" && h.accepts_outputs));
    }

    #[test]
    fn test_binding_is_wildcard() {
        let binding = KeyVaultSecretBinding::default();
        assert!(binding.source_type().is_none());
        assert_eq!(binding.target_type().as_str(), types::KEY_VAULT);
    }
}
