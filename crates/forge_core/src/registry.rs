//! Plugin registry.
//!
//! The registry is a plain context object shared by `Arc`. Writers are
//! expected to be serialized by the caller (startup code or the UI
//! boundary); readers may run concurrently. Lazy plugins are keyed by
//! provider id and loaded at most once, however many callers ask for them
//! at the same time.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::connection::ConnectionRule;
use crate::edge_rules::{EdgeRuleValidator, OutputAcceptingHandle};
use crate::error::{RegistryError, RegistryResult};
use crate::hcl::{BindingHclGenerator, HclGenerator};
use crate::plugin::{
    IconDefinition, InfraPlugin, PaletteCategory, PluginLoader, PluginRegistryReader, ProviderConfig, ProviderId,
    RegisteredHook, ResourceTypeRegistration,
};
use crate::schema::{ResourceSchema, ResourceTypeId};

/// Lifecycle of a lazily registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum LoadState {
    Pending,
    Loading,
    Loaded,
    Error(String),
}

/// Change notification for observers outside the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    PluginRegistered { plugin_id: String, provider_id: ProviderId },
    ProvidersLoaded(Vec<ProviderId>),
    ProviderLoadFailed { provider_id: ProviderId, message: String },
    Finalized,
}

pub type RegistryListener = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

struct LazyEntry {
    loader: Arc<dyn PluginLoader>,
    /// Outcome of the current load attempt, shared by every caller that
    /// joined it. Replaced with a fresh cell when a failed provider is
    /// requested again.
    cell: Arc<OnceCell<RegistryResult<()>>>,
    state: LoadState,
}

impl LazyEntry {
    fn failed(&self) -> bool {
        matches!(self.cell.get(), Some(Err(_)))
    }
}

struct StoredPlugin {
    id: String,
    provider_id: ProviderId,
    hook: Option<RegisteredHook>,
    notified: bool,
}

#[derive(Default)]
struct RegistryState {
    resource_types: IndexMap<ResourceTypeId, ResourceTypeRegistration>,
    providers: IndexMap<ProviderId, Arc<dyn ProviderConfig>>,
    connection_rules: Vec<ConnectionRule>,
    binding_generators: Vec<Arc<dyn BindingHclGenerator>>,
    palette_categories: Vec<PaletteCategory>,
    plugins: Vec<StoredPlugin>,
    lazy: HashMap<ProviderId, LazyEntry>,
}

/// Registry of resource types, provider configs and connection rules
/// contributed by plugins.
#[derive(Default)]
pub struct PluginRegistry {
    state: RwLock<RegistryState>,
    listeners: RwLock<Vec<RegistryListener>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a plugin into the registry.
    ///
    /// A resource type already registered by another plugin is a
    /// configuration error; the registry is left untouched in that case.
    pub fn register_plugin(&self, plugin: InfraPlugin) -> RegistryResult<()> {
        {
            let mut state = self.state.write();

            if let Some(duplicate) = plugin
                .resource_types
                .keys()
                .find(|type_id| state.resource_types.contains_key(*type_id))
            {
                return Err(RegistryError::DuplicateResourceType(duplicate.clone()));
            }

            if let Some(config) = &plugin.provider_config {
                if !state.providers.contains_key(&plugin.provider_id) {
                    state.providers.insert(plugin.provider_id.clone(), Arc::clone(config));
                }
            }

            for (type_id, registration) in plugin.resource_types {
                debug!("Registering resource type: {}", type_id);
                state.resource_types.insert(type_id, registration);
            }

            state.connection_rules.extend(plugin.connection_rules);
            state.binding_generators.extend(plugin.binding_generators);

            for category in plugin.palette_categories {
                if !state.palette_categories.iter().any(|c| c.id == category.id) {
                    state.palette_categories.push(category);
                }
            }

            state.plugins.push(StoredPlugin {
                id: plugin.id.clone(),
                provider_id: plugin.provider_id.clone(),
                hook: plugin.on_all_plugins_registered,
                notified: false,
            });
        }

        info!("Registered plugin {} v{} ({})", plugin.id, plugin.version, plugin.provider_id);
        self.emit(&RegistryEvent::PluginRegistered {
            plugin_id: plugin.id,
            provider_id: plugin.provider_id,
        });
        Ok(())
    }

    /// Declare a plugin that is only built when its provider is requested.
    ///
    /// Re-declaring a provider that has not loaded yet replaces its loader.
    pub fn register_lazy_plugin(&self, provider_id: impl Into<ProviderId>, loader: impl PluginLoader + 'static) {
        let provider_id = provider_id.into();
        let mut state = self.state.write();
        if matches!(state.lazy.get(&provider_id), Some(entry) if entry.state == LoadState::Loaded) {
            warn!("Provider {} is already loaded; ignoring new loader", provider_id);
            return;
        }
        debug!("Declaring lazy plugin for provider: {}", provider_id);
        state.lazy.insert(
            provider_id,
            LazyEntry {
                loader: Arc::new(loader),
                cell: Arc::new(OnceCell::new()),
                state: LoadState::Pending,
            },
        );
    }

    /// Load every requested provider that is not loaded yet.
    ///
    /// Providers load concurrently. Concurrent callers asking for the same
    /// provider share one load and all receive its outcome, failure
    /// included. A provider whose last load failed is retried by the next
    /// call that asks for it. When some loads fail, the successful ones are
    /// still registered and finalized, and the first failure is returned.
    pub async fn load_plugins_for_providers<S: AsRef<str>>(&self, provider_ids: &[S]) -> RegistryResult<()> {
        let mut batch = Vec::new();
        let mut seen = HashSet::new();
        {
            let mut state = self.state.write();
            for provider_id in provider_ids.iter().map(AsRef::as_ref) {
                if !seen.insert(provider_id) {
                    continue;
                }
                let eager = self.has_eager_provider(&state, provider_id);
                match state.lazy.get_mut(provider_id) {
                    Some(entry) if entry.state == LoadState::Loaded => {}
                    Some(entry) => {
                        if entry.failed() {
                            debug!("Retrying failed load for provider: {}", provider_id);
                            entry.cell = Arc::new(OnceCell::new());
                            entry.state = LoadState::Pending;
                        }
                        batch.push((provider_id.to_string(), Arc::clone(&entry.loader), Arc::clone(&entry.cell)));
                    }
                    None if eager => {}
                    None => warn!("No plugin declared for provider {}; skipping", provider_id),
                }
            }
        }

        if batch.is_empty() {
            return Ok(());
        }

        let loads = batch.into_iter().map(|(provider_id, loader, cell)| async move {
            let result = cell
                .get_or_init(|| self.load_provider(&provider_id, loader.as_ref()))
                .await
                .clone();
            (provider_id, result)
        });
        let results = join_all(loads).await;

        self.finalize_incremental();

        let mut loaded = Vec::new();
        let mut first_error = None;
        for (provider_id, result) in results {
            match result {
                Ok(()) => loaded.push(provider_id),
                Err(e) => {
                    self.emit(&RegistryEvent::ProviderLoadFailed {
                        provider_id,
                        message: e.to_string(),
                    });
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if !loaded.is_empty() {
            info!("Loaded providers: {}", loaded.join(", "));
            self.emit(&RegistryEvent::ProvidersLoaded(loaded));
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn load_provider(&self, provider_id: &str, loader: &dyn PluginLoader) -> RegistryResult<()> {
        self.set_load_state(provider_id, LoadState::Loading);
        debug!("Loading plugin for provider: {}", provider_id);

        let outcome = match loader.load().await {
            Ok(plugin) => self.register_plugin(plugin),
            Err(e) => Err(RegistryError::PluginLoad {
                provider: provider_id.to_string(),
                message: format!("{:#}", e),
            }),
        };

        match &outcome {
            Ok(()) => self.set_load_state(provider_id, LoadState::Loaded),
            Err(e) => {
                warn!("Plugin load failed for provider {}: {}", provider_id, e);
                self.set_load_state(provider_id, LoadState::Error(e.to_string()));
            }
        }
        outcome
    }

    fn set_load_state(&self, provider_id: &str, load_state: LoadState) {
        if let Some(entry) = self.state.write().lazy.get_mut(provider_id) {
            entry.state = load_state;
        }
    }

    fn has_eager_provider(&self, state: &RegistryState, provider_id: &str) -> bool {
        state.plugins.iter().any(|p| p.provider_id == provider_id)
    }

    /// Sort the palette and notify plugins registered since the last call.
    pub fn finalize(&self) {
        self.finalize_incremental();
        self.emit(&RegistryEvent::Finalized);
    }

    fn finalize_incremental(&self) {
        let hooks: Vec<(String, RegisteredHook)> = {
            let mut state = self.state.write();
            state.palette_categories.sort_by_key(|c| c.order);
            state
                .plugins
                .iter_mut()
                .filter(|p| !p.notified)
                .filter_map(|p| {
                    p.notified = true;
                    p.hook.clone().map(|hook| (p.id.clone(), hook))
                })
                .collect()
        };

        for (plugin_id, hook) in hooks {
            debug!("Running registration hook for plugin: {}", plugin_id);
            hook(self);
        }
    }

    /// Whether the provider's plugin is registered.
    pub fn is_provider_loaded(&self, provider_id: &str) -> bool {
        let state = self.state.read();
        match state.lazy.get(provider_id) {
            Some(entry) => entry.state == LoadState::Loaded,
            None => self.has_eager_provider(&state, provider_id),
        }
    }

    /// Load state of a lazily declared provider.
    pub fn load_state(&self, provider_id: &str) -> Option<LoadState> {
        self.state.read().lazy.get(provider_id).map(|e| e.state.clone())
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    fn emit(&self, event: &RegistryEvent) {
        let listeners: Vec<RegistryListener> = self.listeners.read().clone();
        for listener in listeners {
            listener(event);
        }
    }

    // --- Queries ---

    pub fn get_registration(&self, type_id: &ResourceTypeId) -> RegistryResult<ResourceTypeRegistration> {
        self.state
            .read()
            .resource_types
            .get(type_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownResourceType(type_id.clone()))
    }

    pub fn get_hcl_generator(&self, type_id: &ResourceTypeId) -> RegistryResult<Arc<dyn HclGenerator>> {
        self.get_registration(type_id).map(|r| r.hcl_generator)
    }

    pub fn get_icon(&self, type_id: &ResourceTypeId) -> RegistryResult<Option<IconDefinition>> {
        self.get_registration(type_id).map(|r| r.icon)
    }

    pub fn get_provider_config(&self, provider_id: &str) -> Option<Arc<dyn ProviderConfig>> {
        self.state.read().providers.get(provider_id).cloned()
    }

    pub fn get_resource_types_for_category(&self, category: &str) -> Vec<ResourceTypeRegistration> {
        self.state
            .read()
            .resource_types
            .values()
            .filter(|r| r.schema.category == category)
            .cloned()
            .collect()
    }

    pub fn get_connection_rules(&self) -> Vec<ConnectionRule> {
        self.state.read().connection_rules.clone()
    }

    pub fn get_palette_categories(&self) -> Vec<PaletteCategory> {
        self.state.read().palette_categories.clone()
    }

    /// Binding generator for a source/target pair. An exact match wins
    /// over a generator that accepts any source.
    pub fn get_binding_generator(
        &self,
        source_type: &ResourceTypeId,
        target_type: &ResourceTypeId,
    ) -> Option<Arc<dyn BindingHclGenerator>> {
        let state = self.state.read();
        let generators = &state.binding_generators;
        generators
            .iter()
            .find(|g| g.source_type() == Some(source_type) && g.target_type() == target_type)
            .or_else(|| {
                generators
                    .iter()
                    .find(|g| g.source_type().is_none() && g.target_type() == target_type)
            })
            .cloned()
    }

    /// Edge validator over the current rules and every handle that
    /// accepts dynamic outputs.
    pub fn build_edge_validator(&self) -> EdgeRuleValidator {
        let state = self.state.read();
        let output_handles = state
            .resource_types
            .values()
            .flat_map(|registration| {
                registration
                    .schema
                    .handles
                    .iter()
                    .filter(|h| h.accepts_outputs)
                    .map(|h| OutputAcceptingHandle {
                        type_id: registration.schema.type_id.clone(),
                        handle_id: h.id.clone(),
                    })
            })
            .collect();
        EdgeRuleValidator::new(state.connection_rules.clone(), output_handles)
    }

    pub fn plugin_ids(&self) -> Vec<String> {
        self.state.read().plugins.iter().map(|p| p.id.clone()).collect()
    }
}

impl PluginRegistryReader for PluginRegistry {
    fn get_resource_type_ids(&self) -> Vec<ResourceTypeId> {
        self.state.read().resource_types.keys().cloned().collect()
    }

    fn get_resource_schema(&self, type_id: &ResourceTypeId) -> Option<Arc<ResourceSchema>> {
        self.state
            .read()
            .resource_types
            .get(type_id)
            .map(|r| Arc::clone(&r.schema))
    }

    fn get_provider_ids(&self) -> Vec<ProviderId> {
        self.state.read().providers.keys().cloned().collect()
    }

    fn has_resource_type(&self, type_id: &ResourceTypeId) -> bool {
        self.state.read().resource_types.contains_key(type_id)
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        let lazy: HashSet<&ProviderId> = state.lazy.keys().collect();
        f.debug_struct("PluginRegistry")
            .field("plugins", &state.plugins.iter().map(|p| &p.id).collect::<Vec<_>>())
            .field("resource_types", &state.resource_types.len())
            .field("lazy_providers", &lazy)
            .finish()
    }
}
