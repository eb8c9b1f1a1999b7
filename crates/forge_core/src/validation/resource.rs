//! Per-resource property checks against a schema.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use super::ValidationError;
use crate::cidr::is_valid_cidr;
use crate::instance::VariableMode;
use crate::schema::{PropertyFieldType, PropertySchema, ResourceSchema};

/// Validate `properties` against every property declared by `schema`.
///
/// Properties in variable mode get their value from a Terraform variable
/// at apply time and are not checked here.
pub fn validate_resource_properties(
    schema: &ResourceSchema,
    properties: &Map<String, Value>,
    variable_overrides: &BTreeMap<String, VariableMode>,
) -> Vec<ValidationError> {
    schema
        .properties
        .iter()
        .filter(|p| variable_overrides.get(&p.key) != Some(&VariableMode::Variable))
        .flat_map(|p| validate_property(p, properties.get(&p.key)))
        .collect()
}

/// Required `reference` properties must be bound to some instance.
pub fn validate_required_references(
    schema: &ResourceSchema,
    references: &BTreeMap<String, String>,
) -> Vec<ValidationError> {
    schema
        .properties
        .iter()
        .filter(|p| p.required && p.field_type == PropertyFieldType::Reference)
        .filter(|p| references.get(&p.key).map_or(true, |target| target.is_empty()))
        .map(|p| ValidationError::error(&p.key, format!("{} is required", p.label)))
        .collect()
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn validate_property(schema: &PropertySchema, value: Option<&Value>) -> Vec<ValidationError> {
    let key = &schema.key;
    let label = &schema.label;
    let mut errors = Vec::new();

    if is_empty(value) {
        if schema.required && schema.field_type != PropertyFieldType::Reference {
            errors.push(ValidationError::error(key, format!("{} is required", label)));
        }
        return errors;
    }
    let Some(value) = value else {
        return errors;
    };

    match value {
        Value::String(s) if schema.field_type == PropertyFieldType::Cidr => {
            if !is_valid_cidr(s) {
                errors.push(ValidationError::error(
                    key,
                    format!("{} must be a valid CIDR block (e.g. 10.0.0.0/16), got \"{}\"", label, s),
                ));
            }
        }
        Value::Array(items) if schema.is_cidr_array() => {
            for (index, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(cidr) if is_valid_cidr(cidr) => {}
                    Some("") | None => errors.push(ValidationError::error(
                        key,
                        format!("{} item {} must be a CIDR block", label, index + 1),
                    )),
                    Some(cidr) => errors.push(ValidationError::error(
                        key,
                        format!("{} item {} is not a valid CIDR block: \"{}\"", label, index + 1, cidr),
                    )),
                }
            }
        }
        _ => {}
    }

    let Some(validation) = &schema.validation else {
        return errors;
    };

    match value {
        Value::String(s) => {
            let length = s.chars().count();
            if let Some(min) = validation.min_length {
                if length < min {
                    errors.push(ValidationError::error(
                        key,
                        format!("{} must be at least {} characters", label, min),
                    ));
                }
            }
            if let Some(max) = validation.max_length {
                if length > max {
                    errors.push(ValidationError::error(
                        key,
                        format!("{} must be at most {} characters", label, max),
                    ));
                }
            }
            if let Some(pattern) = &validation.pattern {
                match Regex::new(pattern) {
                    Ok(re) if !re.is_match(s) => {
                        let message = validation
                            .pattern_message
                            .clone()
                            .unwrap_or_else(|| format!("{} has invalid format", label));
                        errors.push(ValidationError::error(key, message));
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Ignoring invalid validation pattern on {}: {}", key, e),
                }
            }
        }
        Value::Number(n) => {
            let Some(n) = n.as_f64() else {
                return errors;
            };
            if let Some(min) = validation.min {
                if n < min {
                    errors.push(ValidationError::error(key, format!("{} must be at least {}", label, min)));
                }
            }
            if let Some(max) = validation.max {
                if n > max {
                    errors.push(ValidationError::error(key, format!("{} must be at most {}", label, max)));
                }
            }
        }
        _ => {}
    }

    errors
}
