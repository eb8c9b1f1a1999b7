//! Resource type schemas.
//!
//! A [`ResourceSchema`] is built once per plugin at load time and shared
//! through the registry as an `Arc`. Nothing mutates it afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::naming::NamingConstraints;

/// Fully qualified resource type identifier: `{provider}/{category}/{resource}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTypeId(String);

impl ResourceTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segment(&self, index: usize) -> &str {
        self.0.split('/').nth(index).unwrap_or("")
    }

    /// Provider segment, e.g. `azurerm`.
    pub fn provider(&self) -> &str {
        self.segment(0)
    }

    pub fn category(&self) -> &str {
        self.segment(1)
    }

    pub fn resource(&self) -> &str {
        self.segment(2)
    }
}

impl fmt::Display for ResourceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceTypeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceTypeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Editor/field type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyFieldType {
    String,
    Number,
    Boolean,
    Select,
    Multiselect,
    Cidr,
    Tags,
    KeyValueMap,
    Array,
    Object,
    Reference,
}

/// Declarative validation rules attached to a property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regular expression the string value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Message reported instead of the generic "invalid format".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_message: Option<String>,
}

impl PropertyValidation {
    pub fn length(min: usize, max: usize) -> Self {
        Self {
            min_length: Some(min),
            max_length: Some(max),
            ..Self::default()
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::default()
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self.pattern_message = Some(message.into());
        self
    }
}

/// Selectable option for `select` / `multiselect` properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// Schema of a single resource property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: PropertyFieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    /// For `reference` properties: which resource types may be referenced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_target_types: Vec<ResourceTypeId>,
    /// For `array` properties: schema of each item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_schema: Option<Box<PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<PropertyValidation>,
}

impl PropertySchema {
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: PropertyFieldType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            required: false,
            description: None,
            default_value: None,
            options: Vec::new(),
            reference_target_types: Vec::new(),
            item_schema: None,
            validation: None,
        }
    }

    /// Array property whose items follow `item`.
    pub fn array(key: impl Into<String>, label: impl Into<String>, item: PropertySchema) -> Self {
        let mut schema = Self::new(key, label, PropertyFieldType::Array);
        schema.item_schema = Some(Box::new(item));
        schema
    }

    /// Reference property pointing at one of `targets`.
    pub fn reference(
        key: impl Into<String>,
        label: impl Into<String>,
        targets: impl IntoIterator<Item = ResourceTypeId>,
    ) -> Self {
        let mut schema = Self::new(key, label, PropertyFieldType::Reference);
        schema.reference_target_types = targets.into_iter().collect();
        schema
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_options<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = values
            .into_iter()
            .map(|v| {
                let value = v.into();
                SelectOption {
                    label: value.clone(),
                    value,
                }
            })
            .collect();
        self
    }

    pub fn with_validation(mut self, validation: PropertyValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Whether this is an array of CIDR blocks.
    pub fn is_cidr_array(&self) -> bool {
        self.field_type == PropertyFieldType::Array
            && self
                .item_schema
                .as_ref()
                .is_some_and(|item| item.field_type == PropertyFieldType::Cidr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    Source,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlePosition {
    Top,
    Bottom,
    Left,
    Right,
}

/// A connection point on a resource node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: HandleKind,
    pub position: HandlePosition,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepts_types: Vec<ResourceTypeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    /// Accepts edges from dynamic `out-*` output ports of any resource.
    #[serde(default)]
    pub accepts_outputs: bool,
}

impl HandleDefinition {
    pub fn source(id: impl Into<String>, position: HandlePosition, label: impl Into<String>) -> Self {
        Self::new(id, HandleKind::Source, position, label)
    }

    pub fn target(id: impl Into<String>, position: HandlePosition, label: impl Into<String>) -> Self {
        Self::new(id, HandleKind::Target, position, label)
    }

    fn new(id: impl Into<String>, kind: HandleKind, position: HandlePosition, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            label: label.into(),
            accepts_types: Vec::new(),
            max_connections: None,
            accepts_outputs: false,
        }
    }

    pub fn accepting_outputs(mut self) -> Self {
        self.accepts_outputs = true;
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }
}

/// Immutable description of a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    pub type_id: ResourceTypeId,
    pub provider: String,
    pub display_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Terraform resource type, e.g. `azurerm_subnet`. A leading `_`
    /// marks a virtual type that produces no Terraform resource.
    pub terraform_type: String,
    #[serde(default)]
    pub properties: Vec<PropertySchema>,
    #[serde(default)]
    pub handles: Vec<HandleDefinition>,
    #[serde(default)]
    pub supports_tags: bool,
    #[serde(default)]
    pub requires_resource_group: bool,
    #[serde(default)]
    pub is_container: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub can_be_child_of: Vec<ResourceTypeId>,
    /// Cloud Adoption Framework abbreviation used as the `{type}` naming token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caf_abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming_constraints: Option<NamingConstraints>,
}

impl ResourceSchema {
    /// Start a schema. The provider and category are taken from `type_id`.
    pub fn new(
        type_id: impl Into<ResourceTypeId>,
        display_name: impl Into<String>,
        terraform_type: impl Into<String>,
    ) -> Self {
        let type_id = type_id.into();
        Self {
            provider: type_id.provider().to_string(),
            category: type_id.category().to_string(),
            type_id,
            display_name: display_name.into(),
            description: String::new(),
            terraform_type: terraform_type.into(),
            properties: Vec::new(),
            handles: Vec::new(),
            supports_tags: false,
            requires_resource_group: false,
            is_container: false,
            can_be_child_of: Vec::new(),
            caf_abbreviation: None,
            naming_constraints: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn property(mut self, property: PropertySchema) -> Self {
        self.properties.push(property);
        self
    }

    pub fn handle(mut self, handle: HandleDefinition) -> Self {
        self.handles.push(handle);
        self
    }

    pub fn with_tags(mut self) -> Self {
        self.supports_tags = true;
        self
    }

    pub fn in_resource_group(mut self) -> Self {
        self.requires_resource_group = true;
        self
    }

    pub fn container(mut self) -> Self {
        self.is_container = true;
        self
    }

    pub fn child_of(mut self, parent: impl Into<ResourceTypeId>) -> Self {
        self.can_be_child_of.push(parent.into());
        self
    }

    pub fn with_naming(mut self, abbreviation: impl Into<String>, constraints: NamingConstraints) -> Self {
        self.caf_abbreviation = Some(abbreviation.into());
        self.naming_constraints = Some(constraints);
        self
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.key == key)
    }

    /// Whether this type produces no Terraform resource of its own.
    pub fn is_virtual(&self) -> bool {
        self.terraform_type.starts_with('_')
    }
}
