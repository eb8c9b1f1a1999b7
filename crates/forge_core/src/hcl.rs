//! HCL generation contract shared by the pipeline and plugins.
//!
//! Generators never touch pipeline state directly. Everything they need is
//! reached through the [`HclGenerationContext`] passed into each call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GenerationResult;
use crate::instance::ResourceInstance;
use crate::schema::ResourceTypeId;

/// Kind of top-level HCL block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Resource,
    Data,
    Locals,
    Variable,
    Output,
}

/// One unit of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HclBlock {
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terraform_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
    /// `type.name` addresses this block must follow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl HclBlock {
    pub fn resource(terraform_type: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Resource,
            terraform_type: Some(terraform_type.into()),
            name: Some(name.into()),
            content: content.into(),
            depends_on: Vec::new(),
        }
    }

    /// Data source block. Its address carries the `data.` prefix.
    pub fn data(terraform_type: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Data,
            ..Self::resource(terraform_type, name, content)
        }
    }

    /// Anonymous block (locals/variable/output) with no address.
    pub fn anonymous(block_type: BlockType, content: impl Into<String>) -> Self {
        Self {
            block_type,
            terraform_type: None,
            name: None,
            content: content.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(addresses.into_iter().map(Into::into));
        self
    }

    /// Terraform address (`type.name`, or `data.type.name` for data sources).
    pub fn address(&self) -> Option<String> {
        match (&self.terraform_type, &self.name) {
            (Some(t), Some(n)) if self.block_type == BlockType::Data => Some(format!("data.{}.{}", t, n)),
            (Some(t), Some(n)) => Some(format!("{}.{}", t, n)),
            _ => None,
        }
    }
}

/// Validation block attached to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValidation {
    pub condition: String,
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerraformVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<VariableValidation>,
}

impl TerraformVariable {
    pub fn new(name: impl Into<String>, var_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var_type: var_type.into(),
            description: description.into(),
            default_value: None,
            sensitive: false,
            validation: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_validation(mut self, condition: impl Into<String>, error_message: impl Into<String>) -> Self {
        self.validation = Some(VariableValidation {
            condition: condition.into(),
            error_message: error_message.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerraformOutput {
    pub name: String,
    pub value: String,
    pub description: String,
    #[serde(default)]
    pub sensitive: bool,
}

impl TerraformOutput {
    pub fn new(name: impl Into<String>, value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            description: description.into(),
            sensitive: false,
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Overrides for [`HclGenerationContext::get_property_expression`] when the
/// property is in variable mode.
#[derive(Debug, Clone, Default)]
pub struct PropertyExpressionOptions {
    pub variable_name: Option<String>,
    pub variable_type: Option<String>,
    pub variable_description: Option<String>,
    pub sensitive: bool,
}

/// A requested edge from one resource's output attribute into another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputBinding {
    pub source_instance_id: String,
    pub target_instance_id: String,
    pub source_attribute: String,
}

/// Pipeline state as seen by a generator.
pub trait HclGenerationContext {
    fn get_resource(&self, instance_id: &str) -> Option<&ResourceInstance>;

    /// `type.name` address of a non-virtual instance.
    fn get_terraform_address(&self, instance_id: &str) -> Option<String>;

    /// `type.name.attribute`; fails when the instance has no address.
    fn get_attribute_reference(&self, instance_id: &str, attribute: &str) -> GenerationResult<String>;

    /// Register a variable. The first registration of a name wins.
    fn add_variable(&self, variable: TerraformVariable);

    /// Register an output. The first registration of a name wins.
    fn add_output(&self, output: TerraformOutput);

    /// User-supplied provider configuration, empty when absent.
    fn get_provider_config(&self, provider_id: &str) -> Map<String, Value>;

    fn get_resource_group_expression(&self, resource: &ResourceInstance) -> GenerationResult<String>;

    fn get_location_expression(&self, resource: &ResourceInstance) -> GenerationResult<String>;

    /// HCL expression for a property value, honouring the resource's
    /// per-property variable mode.
    fn get_property_expression(
        &self,
        resource: &ResourceInstance,
        property_key: &str,
        value: &Value,
        options: &PropertyExpressionOptions,
    ) -> String;
}

/// Renders the HCL blocks of one resource type.
pub trait HclGenerator: Send + Sync {
    fn generate(
        &self,
        resource: &ResourceInstance,
        context: &dyn HclGenerationContext,
    ) -> GenerationResult<Vec<HclBlock>>;

    /// Terraform type for variant-dependent resources (e.g. Linux vs Windows
    /// VMs). `None` keeps the schema's `terraform_type`.
    fn resolve_terraform_type(&self, _properties: &Map<String, Value>) -> Option<String> {
        None
    }
}

/// Emits a dependent block from one resource's output attribute into another.
pub trait BindingHclGenerator: Send + Sync {
    /// `None` accepts any source type.
    fn source_type(&self) -> Option<&ResourceTypeId>;

    fn target_type(&self) -> &ResourceTypeId;

    fn generate(
        &self,
        source: &ResourceInstance,
        target: &ResourceInstance,
        context: &dyn HclGenerationContext,
        source_attribute: &str,
    ) -> GenerationResult<Vec<HclBlock>>;
}

/// Escape a value for a double-quoted HCL string.
///
/// `${` becomes `$${` so user text cannot inject interpolation.
pub fn escape_hcl_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => escaped.push_str("$$"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Quote and escape a string literal.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape_hcl_string(value))
}

/// Object key: bare when it is a valid HCL identifier, quoted otherwise.
pub fn format_hcl_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if identifier {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Render a JSON value as an HCL literal. Maps are indented for use as an
/// attribute value at one level of nesting.
pub fn format_hcl_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(format_hcl_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(entries) => {
            if entries.is_empty() {
                return "{}".to_string();
            }
            let inner = entries
                .iter()
                .map(|(k, v)| format!("    {} = {}", format_hcl_key(k), format_hcl_value(v)))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{{\n{}\n  }}", inner)
        }
    }
}

/// `["a", "b"]` list of quoted strings.
pub fn string_list(items: &[String]) -> String {
    format!(
        "[{}]",
        items.iter().map(|s| quote(s)).collect::<Vec<_>>().join(", ")
    )
}
