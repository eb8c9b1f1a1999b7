//! Error types for HCL generation.

use forge_core::{GenerationError, RegistryError};
use thiserror::Error;

use crate::pipeline::ValidationReport;

/// Result type alias for HCL operations.
pub type HclResult<T> = Result<T, HclError>;

/// Errors that abort a generation run. No files are produced when any of
/// these is returned.
#[derive(Error, Debug)]
pub enum HclError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Circular dependency detected in HCL blocks ({}). Check resource references.", .0.join(", "))]
    CircularDependency(Vec<String>),

    #[error("Diagram validation failed with {} error(s)", .0.blocking_count())]
    ValidationFailed(Box<ValidationReport>),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
