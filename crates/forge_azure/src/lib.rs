//! # forge_azure
//!
//! Built-in `azurerm` plugins for terraforge.
//!
//! Three plugins share the `azurerm` provider: core (subscriptions and
//! resource groups),
//! networking (virtual networks, subnets, NSGs) and security (key vaults
//! with output-bound secrets). Register them eagerly with [`register_all`]
//! or declare them lazily with [`register_lazy`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_core::PluginRegistry;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry = PluginRegistry::new();
//! forge_azure::register_lazy(&registry);
//! registry.load_plugins_for_providers(&["azurerm"]).await?;
//! assert!(registry.is_provider_loaded("azurerm"));
//! # Ok(())
//! # }
//! ```

mod common;
pub mod networking;
pub mod provider;
pub mod resource_group;
pub mod security;
pub mod subscription;

pub use provider::{AzurermProvider, PROVIDER_ID};

use forge_core::{InfraPlugin, PluginRegistry, RegistryResult};

/// Resource type identifiers contributed by this crate.
pub mod types {
    pub const SUBSCRIPTION: &str = "azurerm/core/subscription";
    pub const RESOURCE_GROUP: &str = "azurerm/core/resource_group";
    pub const VIRTUAL_NETWORK: &str = "azurerm/networking/virtual_network";
    pub const SUBNET: &str = "azurerm/networking/subnet";
    pub const NETWORK_SECURITY_GROUP: &str = "azurerm/networking/network_security_group";
    pub const KEY_VAULT: &str = "azurerm/security/key_vault";
}

pub fn core_plugin() -> InfraPlugin {
    resource_group::plugin()
}

pub fn networking_plugin() -> InfraPlugin {
    networking::plugin()
}

pub fn security_plugin() -> InfraPlugin {
    security::plugin()
}

pub fn plugins() -> Vec<InfraPlugin> {
    vec![core_plugin(), networking_plugin(), security_plugin()]
}

/// Register every built-in plugin and finalize the registry.
pub fn register_all(registry: &PluginRegistry) -> RegistryResult<()> {
    for plugin in plugins() {
        registry.register_plugin(plugin)?;
    }
    registry.finalize();
    Ok(())
}

/// All three plugins folded into one, for the single loader a lazily
/// declared provider gets.
pub fn bundled_plugin() -> InfraPlugin {
    let mut bundle = InfraPlugin::new("azurerm", "Azure", env!("CARGO_PKG_VERSION"), PROVIDER_ID);
    for plugin in plugins() {
        if bundle.provider_config.is_none() {
            bundle.provider_config = plugin.provider_config;
        }
        bundle.resource_types.extend(plugin.resource_types);
        bundle.connection_rules.extend(plugin.connection_rules);
        bundle.palette_categories.extend(plugin.palette_categories);
        bundle.binding_generators.extend(plugin.binding_generators);
        if bundle.on_all_plugins_registered.is_none() {
            bundle.on_all_plugins_registered = plugin.on_all_plugins_registered;
        }
    }
    bundle
}

/// Declare the `azurerm` plugins without building them.
pub fn register_lazy(registry: &PluginRegistry) {
    registry.register_lazy_plugin(PROVIDER_ID, || async { anyhow::Ok(bundled_plugin()) });
}
