//! Networking plugin: virtual networks, subnets and network security groups.

use forge_core::hcl::{quote, string_list};
use forge_core::{
    ConnectionRule, GenerationError, GenerationResult, HandleDefinition, HandlePosition, HclBlock,
    HclGenerationContext, HclGenerator, InfraPlugin, NamingConstraints, PaletteCategory, PropertyFieldType,
    PropertySchema, PropertyValidation, ReferenceSide, ResourceInstance, ResourceSchema, ResourceTypeId,
    ResourceTypeRegistration,
};
use serde::Deserialize;
use serde_json::json;

use crate::common::{container_dependencies, name_expression, property_expression};
use crate::provider::PROVIDER_ID;
use crate::types;

pub const VIRTUAL_NETWORK_REFERENCE: &str = "virtual_network_name";
pub const NSG_REFERENCE: &str = "network_security_group_id";

fn cidr_list(key: &str, label: &str, default: &str) -> PropertySchema {
    PropertySchema::array(key, label, PropertySchema::new("cidr", "CIDR", PropertyFieldType::Cidr))
        .required()
        .with_default(json!([default]))
}

fn name_property(max: usize) -> PropertySchema {
    PropertySchema::new("name", "Name", PropertyFieldType::String)
        .required()
        .with_validation(PropertyValidation::length(1, max))
}

pub fn virtual_network_schema() -> ResourceSchema {
    ResourceSchema::new(types::VIRTUAL_NETWORK, "Virtual Network", "azurerm_virtual_network")
        .with_description("Isolated private network")
        .with_tags()
        .in_resource_group()
        .container()
        .child_of(types::RESOURCE_GROUP)
        .with_naming("vnet", NamingConstraints::default().with_max_length(64))
        .property(name_property(64))
        .property(cidr_list("address_space", "Address Space", "10.0.0.0/16"))
        .property(PropertySchema::new("dns_servers", "DNS Servers", PropertyFieldType::Array))
        .handle(HandleDefinition::source("subnet-out", HandlePosition::Bottom, "Subnets"))
}

pub fn subnet_schema() -> ResourceSchema {
    ResourceSchema::new(types::SUBNET, "Subnet", "azurerm_subnet")
        .with_description("Address range inside a virtual network")
        .child_of(types::VIRTUAL_NETWORK)
        .with_naming("snet", NamingConstraints::default().with_max_length(80))
        .property(name_property(80))
        .property(cidr_list("address_prefixes", "Address Prefixes", "10.0.1.0/24"))
        .property(
            PropertySchema::new("service_endpoints", "Service Endpoints", PropertyFieldType::Multiselect).with_options([
                "Microsoft.Storage",
                "Microsoft.Sql",
                "Microsoft.KeyVault",
                "Microsoft.Web",
            ]),
        )
        .property(
            PropertySchema::reference(
                VIRTUAL_NETWORK_REFERENCE,
                "Virtual Network",
                [ResourceTypeId::new(types::VIRTUAL_NETWORK)],
            )
            .required(),
        )
        .property(PropertySchema::reference(
            NSG_REFERENCE,
            "Network Security Group",
            [ResourceTypeId::new(types::NETWORK_SECURITY_GROUP)],
        ))
        .handle(HandleDefinition::target("vnet-in", HandlePosition::Top, "Virtual Network"))
        .handle(HandleDefinition::target("nsg-in", HandlePosition::Left, "NSG"))
}

pub fn network_security_group_schema() -> ResourceSchema {
    ResourceSchema::new(
        types::NETWORK_SECURITY_GROUP,
        "Network Security Group",
        "azurerm_network_security_group",
    )
    .with_description("Inbound and outbound traffic rules")
    .with_tags()
    .in_resource_group()
    .child_of(types::RESOURCE_GROUP)
    .with_naming("nsg", NamingConstraints::default().with_max_length(80))
    .property(name_property(80))
    .property(PropertySchema::new("security_rules", "Security Rules", PropertyFieldType::Array))
    .handle(HandleDefinition::source("nsg-out", HandlePosition::Right, "Subnets"))
}

pub struct VirtualNetworkGenerator;

impl HclGenerator for VirtualNetworkGenerator {
    fn generate(
        &self,
        resource: &ResourceInstance,
        context: &dyn HclGenerationContext,
    ) -> GenerationResult<Vec<HclBlock>> {
        let mut lines = vec![
            format!("resource \"azurerm_virtual_network\" \"{}\" {{", resource.terraform_name),
            format!("  name                = {}", name_expression(context, resource)),
            format!("  resource_group_name = {}", context.get_resource_group_expression(resource)?),
            format!("  location            = {}", context.get_location_expression(resource)?),
            format!(
                "  address_space       = {}",
                property_expression(context, resource, "address_space", json!(["10.0.0.0/16"]))
            ),
        ];

        let dns_servers = resource.string_list("dns_servers");
        if !dns_servers.is_empty() {
            lines.push(format!("  dns_servers         = {}", string_list(&dns_servers)));
        }

        lines.push(String::new());
        lines.push("  tags = local.common_tags".to_string());
        lines.push("}".to_string());

        Ok(vec![HclBlock::resource(
            "azurerm_virtual_network",
            &resource.terraform_name,
            lines.join("\n"),
        )
        .depends_on(container_dependencies(context, resource))])
    }
}

pub struct SubnetGenerator;

impl HclGenerator for SubnetGenerator {
    fn generate(
        &self,
        resource: &ResourceInstance,
        context: &dyn HclGenerationContext,
    ) -> GenerationResult<Vec<HclBlock>> {
        let vnet_id = resource
            .reference(VIRTUAL_NETWORK_REFERENCE)
            .ok_or_else(|| GenerationError::InvalidProperty {
                resource: resource.terraform_name.clone(),
                property: VIRTUAL_NETWORK_REFERENCE.to_string(),
                message: "subnet is not connected to a virtual network".to_string(),
            })?;
        let vnet = context
            .get_resource(vnet_id)
            .ok_or_else(|| GenerationError::UnresolvedReference(vnet_id.to_string()))?;

        // A subnet lives in its network's resource group.
        let mut lines = vec![
            format!("resource \"azurerm_subnet\" \"{}\" {{", resource.terraform_name),
            format!("  name                 = {}", name_expression(context, resource)),
            format!("  resource_group_name  = {}", context.get_resource_group_expression(vnet)?),
            format!(
                "  virtual_network_name = {}",
                context.get_attribute_reference(vnet_id, "name")?
            ),
            format!(
                "  address_prefixes     = {}",
                property_expression(context, resource, "address_prefixes", json!(["10.0.1.0/24"]))
            ),
        ];

        let endpoints = resource.string_list("service_endpoints");
        if !endpoints.is_empty() {
            lines.push(format!("  service_endpoints    = {}", string_list(&endpoints)));
        }
        lines.push("}".to_string());

        let subnet = HclBlock::resource("azurerm_subnet", &resource.terraform_name, lines.join("\n"))
            .depends_on(context.get_terraform_address(vnet_id));
        let subnet_address = format!("azurerm_subnet.{}", resource.terraform_name);
        let mut blocks = vec![subnet];

        if let Some(nsg_id) = resource.reference(NSG_REFERENCE) {
            let content = [
                format!(
                    "resource \"azurerm_subnet_network_security_group_association\" \"{}\" {{",
                    resource.terraform_name
                ),
                format!("  subnet_id                 = {}.id", subnet_address),
                format!(
                    "  network_security_group_id = {}",
                    context.get_attribute_reference(nsg_id, "id")?
                ),
                "}".to_string(),
            ]
            .join("\n");
            blocks.push(
                HclBlock::resource(
                    "azurerm_subnet_network_security_group_association",
                    &resource.terraform_name,
                    content,
                )
                .depends_on(std::iter::once(subnet_address).chain(context.get_terraform_address(nsg_id))),
            );
        }

        Ok(blocks)
    }
}

#[derive(Debug, Deserialize)]
struct SecurityRule {
    name: String,
    priority: u32,
    direction: String,
    access: String,
    protocol: String,
    #[serde(default = "any")]
    source_port_range: String,
    #[serde(default = "any")]
    destination_port_range: String,
    #[serde(default = "any")]
    source_address_prefix: String,
    #[serde(default = "any")]
    destination_address_prefix: String,
}

fn any() -> String {
    "*".to_string()
}

pub struct NetworkSecurityGroupGenerator;

impl HclGenerator for NetworkSecurityGroupGenerator {
    fn generate(
        &self,
        resource: &ResourceInstance,
        context: &dyn HclGenerationContext,
    ) -> GenerationResult<Vec<HclBlock>> {
        let rules: Vec<SecurityRule> = match resource.property("security_rules") {
            Some(value) if !value.is_null() => {
                serde_json::from_value(value.clone()).map_err(|e| GenerationError::InvalidProperty {
                    resource: resource.terraform_name.clone(),
                    property: "security_rules".to_string(),
                    message: e.to_string(),
                })?
            }
            _ => Vec::new(),
        };

        let mut lines = vec![
            format!("resource \"azurerm_network_security_group\" \"{}\" {{", resource.terraform_name),
            format!("  name                = {}", name_expression(context, resource)),
            format!("  resource_group_name = {}", context.get_resource_group_expression(resource)?),
            format!("  location            = {}", context.get_location_expression(resource)?),
        ];

        for rule in &rules {
            lines.push(String::new());
            lines.push("  security_rule {".to_string());
            lines.push(format!("    name                       = {}", quote(&rule.name)));
            lines.push(format!("    priority                   = {}", rule.priority));
            lines.push(format!("    direction                  = {}", quote(&rule.direction)));
            lines.push(format!("    access                     = {}", quote(&rule.access)));
            lines.push(format!("    protocol                   = {}", quote(&rule.protocol)));
            lines.push(format!("    source_port_range          = {}", quote(&rule.source_port_range)));
            lines.push(format!("    destination_port_range     = {}", quote(&rule.destination_port_range)));
            lines.push(format!("    source_address_prefix      = {}", quote(&rule.source_address_prefix)));
            lines.push(format!("    destination_address_prefix = {}", quote(&rule.destination_address_prefix)));
            lines.push("  }".to_string());
        }

        lines.push(String::new());
        lines.push("  tags = local.common_tags".to_string());
        lines.push("}".to_string());

        Ok(vec![HclBlock::resource(
            "azurerm_network_security_group",
            &resource.terraform_name,
            lines.join("\n"),
        )
        .depends_on(container_dependencies(context, resource))])
    }
}

pub fn connection_rules() -> Vec<ConnectionRule> {
    vec![
        ConnectionRule::new(types::VIRTUAL_NETWORK, "subnet-out", types::SUBNET, "vnet-in")
            .with_label("Contains subnet")
            .creates_reference(ReferenceSide::Source, VIRTUAL_NETWORK_REFERENCE),
        ConnectionRule::new(types::NETWORK_SECURITY_GROUP, "nsg-out", types::SUBNET, "nsg-in")
            .with_label("Associates NSG with subnet")
            .creates_reference(ReferenceSide::Source, NSG_REFERENCE),
    ]
}

pub fn plugin() -> InfraPlugin {
    let mut plugin = InfraPlugin::new(
        "azurerm-networking",
        "Azure Networking",
        env!("CARGO_PKG_VERSION"),
        PROVIDER_ID,
    )
    .resource_type(ResourceTypeRegistration::new(virtual_network_schema(), VirtualNetworkGenerator))
    .resource_type(ResourceTypeRegistration::new(subnet_schema(), SubnetGenerator))
    .resource_type(ResourceTypeRegistration::new(
        network_security_group_schema(),
        NetworkSecurityGroupGenerator,
    ))
    .palette_category(PaletteCategory::new("networking", "Networking", 10));
    for rule in connection_rules() {
        plugin = plugin.connection_rule(rule);
    }
    plugin
}
