//! Generator output checks against a minimal in-memory context.

use std::cell::RefCell;
use std::collections::HashMap;

use forge_azure::networking::{NetworkSecurityGroupGenerator, SubnetGenerator, VirtualNetworkGenerator};
use forge_azure::resource_group::ResourceGroupGenerator;
use forge_azure::security::{KeyVaultGenerator, KeyVaultSecretBinding};
use forge_azure::types;
use forge_core::hcl::format_hcl_value;
use forge_core::{
    BindingHclGenerator, BlockType, GenerationError, GenerationResult, HclGenerationContext, HclGenerator,
    PropertyExpressionOptions, ResourceInstance, TerraformOutput, TerraformVariable, VariableMode,
    RESOURCE_GROUP_REFERENCE,
};
use serde_json::{json, Map, Value};

#[derive(Default)]
struct TestContext {
    resources: HashMap<String, ResourceInstance>,
    addresses: HashMap<String, String>,
    variables: RefCell<Vec<TerraformVariable>>,
}

impl TestContext {
    fn with(mut self, resource: ResourceInstance, terraform_type: &str) -> Self {
        self.addresses.insert(
            resource.instance_id.clone(),
            format!("{}.{}", terraform_type, resource.terraform_name),
        );
        self.resources.insert(resource.instance_id.clone(), resource);
        self
    }
}

impl HclGenerationContext for TestContext {
    fn get_resource(&self, instance_id: &str) -> Option<&ResourceInstance> {
        self.resources.get(instance_id)
    }

    fn get_terraform_address(&self, instance_id: &str) -> Option<String> {
        self.addresses.get(instance_id).cloned()
    }

    fn get_attribute_reference(&self, instance_id: &str, attribute: &str) -> GenerationResult<String> {
        self.addresses
            .get(instance_id)
            .map(|a| format!("{}.{}", a, attribute))
            .ok_or_else(|| GenerationError::UnresolvedReference(instance_id.to_string()))
    }

    fn add_variable(&self, variable: TerraformVariable) {
        self.variables.borrow_mut().push(variable);
    }

    fn add_output(&self, _output: TerraformOutput) {}

    fn get_provider_config(&self, _provider_id: &str) -> Map<String, Value> {
        Map::new()
    }

    fn get_resource_group_expression(&self, resource: &ResourceInstance) -> GenerationResult<String> {
        resource
            .reference(RESOURCE_GROUP_REFERENCE)
            .and_then(|id| self.addresses.get(id))
            .map(|a| format!("{}.name", a))
            .ok_or_else(|| GenerationError::MissingResourceGroup(resource.terraform_name.clone()))
    }

    fn get_location_expression(&self, resource: &ResourceInstance) -> GenerationResult<String> {
        resource
            .reference(RESOURCE_GROUP_REFERENCE)
            .and_then(|id| self.addresses.get(id))
            .map(|a| format!("{}.location", a))
            .ok_or_else(|| GenerationError::MissingLocation(resource.terraform_name.clone()))
    }

    fn get_property_expression(
        &self,
        resource: &ResourceInstance,
        property_key: &str,
        value: &Value,
        _options: &PropertyExpressionOptions,
    ) -> String {
        match resource.variable_mode(property_key) {
            VariableMode::Literal => format_hcl_value(value),
            VariableMode::Variable => {
                let name = format!("{}_{}", resource.terraform_name, property_key);
                self.add_variable(TerraformVariable::new(&name, "string", property_key));
                format!("var.{}", name)
            }
        }
    }
}

fn rg() -> ResourceInstance {
    ResourceInstance::new("rg-1", types::RESOURCE_GROUP, "main").with_property("name", "rg-demo")
}

fn vnet() -> ResourceInstance {
    ResourceInstance::new("vnet-1", types::VIRTUAL_NETWORK, "hub")
        .with_property("name", "vnet-hub")
        .with_property("dns_servers", json!(["10.0.0.4"]))
        .with_reference(RESOURCE_GROUP_REFERENCE, "rg-1")
}

#[test]
fn test_resource_group_block() {
    let ctx = TestContext::default();
    let blocks = ResourceGroupGenerator.generate(&rg(), &ctx).unwrap();
    assert_eq!(
        blocks[0].content,
        "resource \"azurerm_resource_group\" \"main\" {\n  name     = \"rg-demo\"\n  location = \"eastus\"\n\n  tags = local.common_tags\n}"
    );
    assert!(blocks[0].depends_on.is_empty());
}

#[test]
fn test_virtual_network_block() {
    let ctx = TestContext::default().with(rg(), "azurerm_resource_group");
    let blocks = VirtualNetworkGenerator.generate(&vnet(), &ctx).unwrap();

    let content = &blocks[0].content;
    assert!(content.contains("  address_space       = [\"10.0.0.0/16\"]"));
    assert!(content.contains("  dns_servers         = [\"10.0.0.4\"]"));
    assert_eq!(blocks[0].depends_on, vec!["azurerm_resource_group.main"]);
}

#[test]
fn test_subnet_requires_network() {
    let ctx = TestContext::default();
    let subnet = ResourceInstance::new("s1", types::SUBNET, "app");
    let err = SubnetGenerator.generate(&subnet, &ctx).unwrap_err();
    assert!(matches!(err, GenerationError::InvalidProperty { .. }));
}

#[test]
fn test_subnet_with_nsg_association() {
    let nsg = ResourceInstance::new("nsg-1", types::NETWORK_SECURITY_GROUP, "web")
        .with_reference(RESOURCE_GROUP_REFERENCE, "rg-1");
    let ctx = TestContext::default()
        .with(rg(), "azurerm_resource_group")
        .with(vnet(), "azurerm_virtual_network")
        .with(nsg, "azurerm_network_security_group");
    let subnet = ResourceInstance::new("s1", types::SUBNET, "app")
        .with_reference("virtual_network_name", "vnet-1")
        .with_reference("network_security_group_id", "nsg-1")
        .with_variable("address_prefixes");

    let blocks = SubnetGenerator.generate(&subnet, &ctx).unwrap();
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].content.contains("  resource_group_name  = azurerm_resource_group.main.name"));
    assert!(blocks[0].content.contains("  address_prefixes     = var.app_address_prefixes"));
    assert_eq!(blocks[0].depends_on, vec!["azurerm_virtual_network.hub"]);
    assert_eq!(
        blocks[1].depends_on,
        vec!["azurerm_subnet.app", "azurerm_network_security_group.web"]
    );
    assert_eq!(ctx.variables.borrow().len(), 1);
}

#[test]
fn test_nsg_rejects_malformed_rules() {
    let ctx = TestContext::default().with(rg(), "azurerm_resource_group");
    let nsg = ResourceInstance::new("nsg-1", types::NETWORK_SECURITY_GROUP, "web")
        .with_property("security_rules", json!([{ "name": "missing-priority" }]))
        .with_reference(RESOURCE_GROUP_REFERENCE, "rg-1");
    let err = NetworkSecurityGroupGenerator.generate(&nsg, &ctx).unwrap_err();
    assert!(matches!(err, GenerationError::InvalidProperty { ref property, .. } if property == "security_rules"));
}

#[test]
fn test_nsg_rule_fields_are_escaped() {
    let ctx = TestContext::default().with(rg(), "azurerm_resource_group");
    let nsg = ResourceInstance::new("nsg-1", types::NETWORK_SECURITY_GROUP, "web")
        .with_property(
            "security_rules",
            json!([{
                "name": "allow \"web\"",
                "priority": 100,
                "direction": "Inbound",
                "access": "Allow",
                "protocol": "Tcp",
                "source_address_prefix": "${var.office_ip}"
            }]),
        )
        .with_reference(RESOURCE_GROUP_REFERENCE, "rg-1");

    let content = &NetworkSecurityGroupGenerator.generate(&nsg, &ctx).unwrap()[0].content;
    assert!(content.contains(r#"    name                       = "allow \"web\"""#));
    assert!(content.contains(r#"    source_address_prefix      = "$${var.office_ip}""#));
    assert!(content.contains(r#"    destination_port_range     = "*""#));
}

#[test]
fn test_key_vault_emits_client_config() {
    let ctx = TestContext::default().with(rg(), "azurerm_resource_group");
    let kv = ResourceInstance::new("kv-1", types::KEY_VAULT, "secrets")
        .with_property("name", "kv-demo")
        .with_property("soft_delete_retention_days", 30)
        .with_property("purge_protection_enabled", true)
        .with_reference(RESOURCE_GROUP_REFERENCE, "rg-1");

    let blocks = KeyVaultGenerator.generate(&kv, &ctx).unwrap();
    assert_eq!(blocks[0].block_type, BlockType::Data);
    assert_eq!(blocks[0].address().as_deref(), Some("data.azurerm_client_config.current"));
    assert!(blocks[1].content.contains("  soft_delete_retention_days = 30"));
    assert!(blocks[1].content.contains("  purge_protection_enabled   = true"));
    assert!(blocks[1].depends_on.contains(&"data.azurerm_client_config.current".to_string()));
}

#[test]
fn test_secret_binding_names() {
    let kv = ResourceInstance::new("kv-1", types::KEY_VAULT, "secrets");
    let ctx = TestContext::default()
        .with(vnet(), "azurerm_virtual_network")
        .with(kv.clone(), "azurerm_key_vault");

    let blocks = KeyVaultSecretBinding::default()
        .generate(&vnet(), &kv, &ctx, "resource_guid")
        .unwrap();
    let content = &blocks[0].content;
    assert_eq!(blocks[0].name.as_deref(), Some("hub_resource_guid"));
    assert!(content.contains("  name         = \"vnet-hub-resource-guid\""));
    assert!(content.contains("  key_vault_id = azurerm_key_vault.secrets.id"));
    assert_eq!(
        blocks[0].depends_on,
        vec!["azurerm_virtual_network.hub", "azurerm_key_vault.secrets"]
    );
}
