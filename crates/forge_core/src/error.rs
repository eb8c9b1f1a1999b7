//! Error types for the core module.

use thiserror::Error;

use crate::schema::ResourceTypeId;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for HCL generator calls.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors raised by the plugin registry.
///
/// These describe an invalid system configuration, not bad diagram data.
/// Only `PluginLoad` is retried, by the next load request for the provider.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("Resource type \"{0}\" is already registered. Collision between plugins.")]
    DuplicateResourceType(ResourceTypeId),

    #[error("Unknown resource type: \"{0}\"")]
    UnknownResourceType(ResourceTypeId),

    #[error("Failed to load plugin for provider {provider}: {message}")]
    PluginLoad { provider: String, message: String },
}

/// Errors a generator may raise while rendering a resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Cannot resolve reference to instance \"{0}\": not found")]
    UnresolvedReference(String),

    #[error(
        "Resource \"{0}\" requires a Resource Group but none was found. \
         Place the resource inside a Resource Group container on the canvas."
    )]
    MissingResourceGroup(String),

    #[error(
        "Resource \"{0}\" requires a location but no Resource Group was found. \
         Place the resource inside a Resource Group container on the canvas."
    )]
    MissingLocation(String),

    #[error("Invalid property {property} on {resource}: {message}")]
    InvalidProperty {
        resource: String,
        property: String,
        message: String,
    },
}
