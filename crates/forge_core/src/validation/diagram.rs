//! Whole-diagram validation before generation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resource::{validate_required_references, validate_resource_properties};
use super::ValidationError;
use crate::instance::ResourceInstance;
use crate::plugin::PluginRegistryReader;
use crate::schema::ResourceTypeId;

/// Problems found on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramError {
    pub instance_id: String,
    pub type_id: ResourceTypeId,
    pub label: String,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramValidationResult {
    pub valid: bool,
    pub errors: Vec<DiagramError>,
}

impl DiagramValidationResult {
    /// Whether any finding has error severity.
    pub fn has_blocking_errors(&self) -> bool {
        self.errors.iter().flat_map(|e| &e.errors).any(ValidationError::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.errors.iter().map(|e| e.errors.len()).sum()
    }
}

/// Validate every resource against its schema and check that references
/// point at instances that exist in the diagram.
pub fn validate_diagram(resources: &[ResourceInstance], registry: &dyn PluginRegistryReader) -> DiagramValidationResult {
    let instance_ids: HashSet<&str> = resources.iter().map(|r| r.instance_id.as_str()).collect();
    let mut diagram_errors = Vec::new();

    for resource in resources {
        let Some(schema) = registry.get_resource_schema(&resource.type_id) else {
            diagram_errors.push(DiagramError {
                instance_id: resource.instance_id.clone(),
                type_id: resource.type_id.clone(),
                label: resource.terraform_name.clone(),
                errors: vec![ValidationError::error(
                    "_type",
                    format!("Unknown resource type: {}", resource.type_id),
                )],
            });
            continue;
        };

        let mut errors = validate_resource_properties(&schema, &resource.properties, &resource.variable_overrides);
        errors.extend(validate_required_references(&schema, &resource.references));
        errors.extend(
            resource
                .references
                .iter()
                .filter(|(_, target)| !instance_ids.contains(target.as_str()))
                .map(|(key, target)| {
                    ValidationError::error(
                        key,
                        format!("Reference \"{}\" points to non-existent resource: {}", key, target),
                    )
                }),
        );

        if !errors.is_empty() {
            debug!("{} finding(s) on {}", errors.len(), resource.instance_id);
            diagram_errors.push(DiagramError {
                instance_id: resource.instance_id.clone(),
                type_id: resource.type_id.clone(),
                label: resource.terraform_name.clone(),
                errors,
            });
        }
    }

    DiagramValidationResult {
        valid: diagram_errors.is_empty(),
        errors: diagram_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PropertyFieldType, PropertySchema, ResourceSchema};
    use std::sync::Arc;

    struct OneSchema(Arc<ResourceSchema>);

    impl PluginRegistryReader for OneSchema {
        fn get_resource_type_ids(&self) -> Vec<ResourceTypeId> {
            vec![self.0.type_id.clone()]
        }

        fn get_resource_schema(&self, type_id: &ResourceTypeId) -> Option<Arc<ResourceSchema>> {
            (type_id == &self.0.type_id).then(|| Arc::clone(&self.0))
        }

        fn get_provider_ids(&self) -> Vec<String> {
            vec!["azurerm".to_string()]
        }

        fn has_resource_type(&self, type_id: &ResourceTypeId) -> bool {
            type_id == &self.0.type_id
        }
    }

    fn registry() -> OneSchema {
        OneSchema(Arc::new(
            ResourceSchema::new("azurerm/networking/subnet", "Subnet", "azurerm_subnet")
                .property(PropertySchema::new("name", "Name", PropertyFieldType::String).required()),
        ))
    }

    #[test]
    fn test_clean_diagram() {
        let resources = vec![ResourceInstance::new("s1", "azurerm/networking/subnet", "app").with_property("name", "snet-app")];
        let result = validate_diagram(&resources, &registry());
        assert!(result.valid);
        assert!(!result.has_blocking_errors());
    }

    #[test]
    fn test_unknown_type_single_error() {
        let resources = vec![ResourceInstance::new("x", "azurerm/compute/vm", "vm").with_property("whatever", 1)];
        let result = validate_diagram(&resources, &registry());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].errors.len(), 1);
        assert_eq!(result.errors[0].errors[0].property_key, "_type");
        assert_eq!(result.errors[0].errors[0].message, "Unknown resource type: azurerm/compute/vm");
    }

    #[test]
    fn test_dangling_reference() {
        let resources = vec![ResourceInstance::new("s1", "azurerm/networking/subnet", "app")
            .with_property("name", "snet")
            .with_reference("network_security_group_id", "gone")];
        let result = validate_diagram(&resources, &registry());
        assert!(result.has_blocking_errors());
        assert_eq!(
            result.errors[0].errors[0].message,
            "Reference \"network_security_group_id\" points to non-existent resource: gone"
        );
    }

    #[test]
    fn test_findings_grouped_per_resource() {
        let resources = vec![
            ResourceInstance::new("s1", "azurerm/networking/subnet", "one").with_reference("x", "missing"),
            ResourceInstance::new("s2", "azurerm/networking/subnet", "two").with_property("name", "ok"),
        ];
        let result = validate_diagram(&resources, &registry());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].label, "one");
        assert_eq!(result.error_count(), 2);
    }
}
