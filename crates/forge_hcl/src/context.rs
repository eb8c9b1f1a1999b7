//! Generation context handed to every generator during one pipeline run.

use std::cell::RefCell;
use std::collections::HashMap;

use forge_core::hcl::format_hcl_value;
use forge_core::{
    GenerationError, GenerationResult, HclGenerationContext, PropertyExpressionOptions, ResourceInstance,
    TerraformOutput, TerraformVariable, VariableMode, RESOURCE_GROUP_REFERENCE,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::collector::{OutputCollector, VariableCollector};
use crate::config::{ProjectConfig, ProjectSetting};

pub const RESOURCE_GROUP_VARIABLE: &str = "resource_group_name";
pub const LOCATION_VARIABLE: &str = "location";

/// Per-run state. Resources are stored without cost hints; collectors
/// fill up as generators register variables and outputs.
pub struct PipelineContext<'a> {
    resources: IndexMap<String, ResourceInstance>,
    addresses: HashMap<String, String>,
    project: &'a ProjectConfig,
    variables: RefCell<VariableCollector>,
    outputs: RefCell<OutputCollector>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        resources: IndexMap<String, ResourceInstance>,
        addresses: HashMap<String, String>,
        project: &'a ProjectConfig,
    ) -> Self {
        Self {
            resources,
            addresses,
            project,
            variables: RefCell::new(VariableCollector::new()),
            outputs: RefCell::new(OutputCollector::new()),
        }
    }

    /// Register the project-wide resource group and location variables
    /// when the project exposes them as variables.
    pub fn seed_project_variables(&self) {
        if let Some(setting) = self.project.resource_group.as_ref().filter(|s| s.as_variable) {
            self.add_variable(seeded_variable(RESOURCE_GROUP_VARIABLE, "Name of the resource group", setting));
        }
        if let Some(setting) = self.project.location.as_ref().filter(|s| s.as_variable) {
            self.add_variable(seeded_variable(LOCATION_VARIABLE, "Azure region for all resources", setting));
        }
    }

    pub fn into_collectors(self) -> (VariableCollector, OutputCollector) {
        (self.variables.into_inner(), self.outputs.into_inner())
    }

    /// Address of the container resource group, if the resource sits in one
    /// that produced a Terraform resource.
    fn resource_group_address(&self, resource: &ResourceInstance) -> Option<&str> {
        resource
            .reference(RESOURCE_GROUP_REFERENCE)
            .and_then(|id| self.addresses.get(id))
            .map(String::as_str)
    }

    fn project_expression(setting: Option<&ProjectSetting>, variable: &str) -> Option<String> {
        let setting = setting?;
        if setting.as_variable {
            Some(format!("var.{}", variable))
        } else if !setting.value.is_empty() {
            Some(format_hcl_value(&Value::String(setting.value.clone())))
        } else {
            None
        }
    }
}

fn seeded_variable(name: &str, description: &str, setting: &ProjectSetting) -> TerraformVariable {
    let variable = TerraformVariable::new(name, "string", description);
    if setting.value.is_empty() {
        variable
    } else {
        variable.with_default(Value::String(setting.value.clone()))
    }
}

fn infer_variable_type(value: &Value) -> &'static str {
    match value {
        Value::Number(_) => "number",
        Value::Bool(_) => "bool",
        Value::Array(_) => "list(string)",
        Value::Object(_) => "map(string)",
        _ => "string",
    }
}

impl HclGenerationContext for PipelineContext<'_> {
    fn get_resource(&self, instance_id: &str) -> Option<&ResourceInstance> {
        self.resources.get(instance_id)
    }

    fn get_terraform_address(&self, instance_id: &str) -> Option<String> {
        self.addresses.get(instance_id).cloned()
    }

    fn get_attribute_reference(&self, instance_id: &str, attribute: &str) -> GenerationResult<String> {
        self.addresses
            .get(instance_id)
            .map(|address| format!("{}.{}", address, attribute))
            .ok_or_else(|| GenerationError::UnresolvedReference(instance_id.to_string()))
    }

    fn add_variable(&self, variable: TerraformVariable) {
        self.variables.borrow_mut().add(variable);
    }

    fn add_output(&self, output: TerraformOutput) {
        self.outputs.borrow_mut().add(output);
    }

    fn get_provider_config(&self, provider_id: &str) -> Map<String, Value> {
        self.project.provider_config(provider_id)
    }

    fn get_resource_group_expression(&self, resource: &ResourceInstance) -> GenerationResult<String> {
        if let Some(address) = self.resource_group_address(resource) {
            return Ok(format!("{}.name", address));
        }
        Self::project_expression(self.project.resource_group.as_ref(), RESOURCE_GROUP_VARIABLE)
            .ok_or_else(|| GenerationError::MissingResourceGroup(resource.terraform_name.clone()))
    }

    fn get_location_expression(&self, resource: &ResourceInstance) -> GenerationResult<String> {
        if let Some(address) = self.resource_group_address(resource) {
            return Ok(format!("{}.location", address));
        }
        Self::project_expression(self.project.location.as_ref(), LOCATION_VARIABLE)
            .ok_or_else(|| GenerationError::MissingLocation(resource.terraform_name.clone()))
    }

    fn get_property_expression(
        &self,
        resource: &ResourceInstance,
        property_key: &str,
        value: &Value,
        options: &PropertyExpressionOptions,
    ) -> String {
        if resource.variable_mode(property_key) == VariableMode::Literal {
            return format_hcl_value(value);
        }

        let name = options
            .variable_name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", resource.terraform_name, property_key));
        let var_type = options
            .variable_type
            .clone()
            .unwrap_or_else(|| infer_variable_type(value).to_string());
        let description = options
            .variable_description
            .clone()
            .unwrap_or_else(|| format!("{} for {}", property_key, resource.terraform_name));

        let mut variable = TerraformVariable::new(&name, var_type, description);
        if !value.is_null() {
            variable = variable.with_default(value.clone());
        }
        if options.sensitive {
            variable = variable.sensitive();
        }
        self.add_variable(variable);

        format!("var.{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(project: &ProjectConfig) -> PipelineContext<'_> {
        let rg = ResourceInstance::new("rg-1", "azurerm/core/resource_group", "main");
        let vnet = ResourceInstance::new("vnet-1", "azurerm/networking/virtual_network", "hub")
            .with_reference(RESOURCE_GROUP_REFERENCE, "rg-1");
        let mut resources = IndexMap::new();
        resources.insert(rg.instance_id.clone(), rg);
        resources.insert(vnet.instance_id.clone(), vnet);

        let mut addresses = HashMap::new();
        addresses.insert("rg-1".to_string(), "azurerm_resource_group.main".to_string());
        addresses.insert("vnet-1".to_string(), "azurerm_virtual_network.hub".to_string());
        PipelineContext::new(resources, addresses, project)
    }

    #[test]
    fn test_attribute_reference() {
        let project = ProjectConfig::default();
        let ctx = context(&project);
        assert_eq!(
            ctx.get_attribute_reference("vnet-1", "id").unwrap(),
            "azurerm_virtual_network.hub.id"
        );
        assert_eq!(
            ctx.get_attribute_reference("nope", "id"),
            Err(GenerationError::UnresolvedReference("nope".to_string()))
        );
    }

    #[test]
    fn test_resource_group_from_container() {
        let project = ProjectConfig::default();
        let ctx = context(&project);
        let vnet = ctx.get_resource("vnet-1").unwrap().clone();
        assert_eq!(ctx.get_resource_group_expression(&vnet).unwrap(), "azurerm_resource_group.main.name");
        assert_eq!(ctx.get_location_expression(&vnet).unwrap(), "azurerm_resource_group.main.location");
    }

    #[test]
    fn test_resource_group_fallbacks() {
        let orphan = ResourceInstance::new("x", "azurerm/web/app", "api");

        let project = ProjectConfig::default();
        let ctx = context(&project);
        assert!(matches!(
            ctx.get_resource_group_expression(&orphan),
            Err(GenerationError::MissingResourceGroup(name)) if name == "api"
        ));
        assert!(matches!(ctx.get_location_expression(&orphan), Err(GenerationError::MissingLocation(_))));

        let project = ProjectConfig {
            resource_group: Some(ProjectSetting::literal("rg-shared")),
            location: Some(ProjectSetting::variable("westeurope")),
            ..ProjectConfig::default()
        };
        let ctx = context(&project);
        assert_eq!(ctx.get_resource_group_expression(&orphan).unwrap(), "\"rg-shared\"");
        assert_eq!(ctx.get_location_expression(&orphan).unwrap(), "var.location");
    }

    #[test]
    fn test_seeded_variables() {
        let project = ProjectConfig {
            resource_group: Some(ProjectSetting::variable("")),
            location: Some(ProjectSetting::variable("westeurope")),
            ..ProjectConfig::default()
        };
        let ctx = context(&project);
        ctx.seed_project_variables();
        let (variables, _) = ctx.into_collectors();
        let all = variables.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "resource_group_name");
        assert!(all[0].default_value.is_none());
        assert_eq!(all[1].default_value, Some(json!("westeurope")));
    }

    #[test]
    fn test_property_expression_modes() {
        let project = ProjectConfig::default();
        let ctx = context(&project);
        let literal = ResourceInstance::new("a", "azurerm/web/app", "api");
        let variable = literal.clone().with_variable("sku");

        let opts = PropertyExpressionOptions::default();
        assert_eq!(ctx.get_property_expression(&literal, "sku", &json!("S1"), &opts), "\"S1\"");
        assert_eq!(ctx.get_property_expression(&variable, "sku", &json!("S1"), &opts), "var.api_sku");
        assert_eq!(ctx.get_property_expression(&variable, "sku", &json!("P1"), &opts), "var.api_sku");

        let named = PropertyExpressionOptions {
            variable_name: Some("db_password".into()),
            sensitive: true,
            ..PropertyExpressionOptions::default()
        };
        let secret = literal.clone().with_variable("password");
        assert_eq!(ctx.get_property_expression(&secret, "password", &json!(null), &named), "var.db_password");

        let (variables, _) = ctx.into_collectors();
        let all = variables.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].default_value, Some(json!("S1")));
        assert_eq!(all[0].description, "sku for api");
        assert!(all[1].sensitive);
        assert!(all[1].default_value.is_none());
    }
}
