//! Plugin contract.
//!
//! A plugin bundles the resource types of one provider area (schemas and
//! HCL generators), its connection rules, palette categories and optional
//! binding generators. Plugins are registered eagerly with
//! [`PluginRegistry::register_plugin`](crate::PluginRegistry::register_plugin)
//! or declared lazily through a [`PluginLoader`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::connection::ConnectionRule;
use crate::hcl::{BindingHclGenerator, HclGenerator};
use crate::schema::{PropertySchema, ResourceSchema, ResourceTypeId};

/// Terraform provider identifier, e.g. `azurerm`, `aws`, `google`.
pub type ProviderId = String;

/// Palette icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum IconDefinition {
    Svg(String),
    /// Name of an icon bundled with the UI.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteCategory {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconDefinition>,
    pub order: i32,
}

impl PaletteCategory {
    pub fn new(id: impl Into<String>, label: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            icon: None,
            order,
        }
    }
}

/// Everything the registry knows about one resource type.
#[derive(Clone)]
pub struct ResourceTypeRegistration {
    pub schema: Arc<ResourceSchema>,
    pub hcl_generator: Arc<dyn HclGenerator>,
    pub icon: Option<IconDefinition>,
}

impl ResourceTypeRegistration {
    pub fn new(schema: ResourceSchema, hcl_generator: impl HclGenerator + 'static) -> Self {
        Self {
            schema: Arc::new(schema),
            hcl_generator: Arc::new(hcl_generator),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: IconDefinition) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn type_id(&self) -> &ResourceTypeId {
        &self.schema.type_id
    }
}

impl fmt::Debug for ResourceTypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTypeRegistration")
            .field("type_id", &self.schema.type_id)
            .field("icon", &self.icon.is_some())
            .finish()
    }
}

/// A Terraform provider definition. One plugin per provider registers it;
/// the first registration wins.
pub trait ProviderConfig: Send + Sync {
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Registry source, e.g. `hashicorp/azurerm`.
    fn source(&self) -> &str;

    /// Version constraint, e.g. `~> 4.0`.
    fn version(&self) -> &str;

    fn config_schema(&self) -> Vec<PropertySchema> {
        Vec::new()
    }

    fn default_config(&self) -> Map<String, Value> {
        Map::new()
    }

    /// The `provider "<id>" { ... }` block for the given user config.
    fn generate_provider_block(&self, config: &Map<String, Value>) -> String;

    /// Entry for the `required_providers` block.
    fn generate_required_provider(&self) -> String {
        format!(
            "    {} = {{\n      source  = \"{}\"\n      version = \"{}\"\n    }}",
            self.id(),
            self.source(),
            self.version()
        )
    }
}

/// Read-only registry view handed to plugin lifecycle hooks.
pub trait PluginRegistryReader {
    fn get_resource_type_ids(&self) -> Vec<ResourceTypeId>;
    fn get_resource_schema(&self, type_id: &ResourceTypeId) -> Option<Arc<ResourceSchema>>;
    fn get_provider_ids(&self) -> Vec<ProviderId>;
    fn has_resource_type(&self, type_id: &ResourceTypeId) -> bool;
}

/// Hook run once after the plugin and its batch have been registered.
pub type RegisteredHook = Arc<dyn Fn(&dyn PluginRegistryReader) + Send + Sync>;

/// A unit of registration.
#[derive(Clone)]
pub struct InfraPlugin {
    pub id: String,
    pub name: String,
    pub version: String,
    pub provider_id: ProviderId,
    pub provider_config: Option<Arc<dyn ProviderConfig>>,
    pub resource_types: IndexMap<ResourceTypeId, ResourceTypeRegistration>,
    pub connection_rules: Vec<ConnectionRule>,
    pub palette_categories: Vec<PaletteCategory>,
    pub binding_generators: Vec<Arc<dyn BindingHclGenerator>>,
    pub on_all_plugins_registered: Option<RegisteredHook>,
}

impl InfraPlugin {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        provider_id: impl Into<ProviderId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            provider_id: provider_id.into(),
            provider_config: None,
            resource_types: IndexMap::new(),
            connection_rules: Vec::new(),
            palette_categories: Vec::new(),
            binding_generators: Vec::new(),
            on_all_plugins_registered: None,
        }
    }

    pub fn with_provider_config(mut self, config: Arc<dyn ProviderConfig>) -> Self {
        self.provider_config = Some(config);
        self
    }

    pub fn resource_type(mut self, registration: ResourceTypeRegistration) -> Self {
        self.resource_types.insert(registration.type_id().clone(), registration);
        self
    }

    pub fn connection_rule(mut self, rule: ConnectionRule) -> Self {
        self.connection_rules.push(rule);
        self
    }

    pub fn palette_category(mut self, category: PaletteCategory) -> Self {
        self.palette_categories.push(category);
        self
    }

    pub fn binding_generator(mut self, generator: impl BindingHclGenerator + 'static) -> Self {
        self.binding_generators.push(Arc::new(generator));
        self
    }

    pub fn on_all_plugins_registered<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn PluginRegistryReader) + Send + Sync + 'static,
    {
        self.on_all_plugins_registered = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for InfraPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraPlugin")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("provider_id", &self.provider_id)
            .field("resource_types", &self.resource_types.keys().collect::<Vec<_>>())
            .field("connection_rules", &self.connection_rules.len())
            .finish()
    }
}

/// Deferred plugin construction, typically an on-demand module import.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    async fn load(&self) -> anyhow::Result<InfraPlugin>;
}

#[async_trait]
impl<F, Fut> PluginLoader for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<InfraPlugin>> + Send + 'static,
{
    async fn load(&self) -> anyhow::Result<InfraPlugin> {
        (self)().await
    }
}
