//! Validate command - Check a diagram without generating.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use forge_core::ValidationError;
use forge_hcl::{HclPipeline, ValidationReport};
use tracing::info;

use crate::document::{load_registry, DiagramDocument};

#[derive(Args)]
pub struct ValidateArgs {
    /// Diagram document (.yaml, .yml or .json)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating diagram: {}", args.input.display());

    let document = DiagramDocument::from_file(&args.input)?;
    let registry = load_registry(&document.provider_ids()).await?;
    let report = HclPipeline::new(registry).validate(&document.resources, &document.topology);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_blocking() {
        anyhow::bail!("Diagram validation failed with {} error(s)", report.blocking_count());
    }
    if !args.json {
        println!("✅ Diagram is valid");
    }
    Ok(())
}

/// Human-readable findings, one line per problem.
pub fn render_report(report: &ValidationReport) -> Vec<String> {
    let mut lines = Vec::new();
    for resource in &report.diagram.errors {
        for error in &resource.errors {
            lines.push(format_finding(&resource.label, error));
        }
    }
    for node in &report.topology {
        for error in &node.errors {
            lines.push(format_finding(&node.instance_id, error));
        }
    }
    lines
}

fn format_finding(subject: &str, error: &ValidationError) -> String {
    let marker = if error.is_error() { "❌" } else { "⚠️ " };
    format!("   {} {} [{}]: {}", marker, subject, error.property_key, error.message)
}

pub fn print_report(report: &ValidationReport) {
    for line in render_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::validation::{DiagramError, DiagramValidationResult, TopologyError};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_render_report() {
        let report = ValidationReport {
            diagram: DiagramValidationResult {
                valid: false,
                errors: vec![DiagramError {
                    instance_id: "s1".into(),
                    type_id: "azurerm/networking/subnet".into(),
                    label: "snet-app".into(),
                    errors: vec![ValidationError::error("virtual_network_name", "Virtual Network is required")],
                }],
            },
            topology: vec![TopologyError {
                instance_id: "s2".into(),
                errors: vec![ValidationError::warning("address_prefixes", "overlaps")],
            }],
        };

        let lines = render_report(&report);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("❌ snet-app [virtual_network_name]: Virtual Network is required"));
        assert!(lines[1].contains("s2 [address_prefixes]: overlaps"));
    }

    #[tokio::test]
    async fn test_invalid_diagram_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diagram.json");
        fs::write(
            &path,
            r#"{"resources": [{"instanceId": "s1", "typeId": "azurerm/networking/subnet", "terraformName": "app"}]}"#,
        )
        .unwrap();

        let err = execute(ValidateArgs { input: path, json: false }).await.unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }

    #[tokio::test]
    async fn test_subnet_outside_network_fails_without_topology() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diagram.json");
        fs::write(
            &path,
            r#"{
  "resources": [
    {
      "instanceId": "rg-1",
      "typeId": "azurerm/core/resource_group",
      "terraformName": "main",
      "properties": { "name": "rg-demo", "location": "westeurope" }
    },
    {
      "instanceId": "vnet-1",
      "typeId": "azurerm/networking/virtual_network",
      "terraformName": "hub",
      "properties": { "name": "vnet-hub", "address_space": ["10.0.0.0/16"] },
      "references": { "_resource_group": "rg-1" }
    },
    {
      "instanceId": "subnet-1",
      "typeId": "azurerm/networking/subnet",
      "terraformName": "app",
      "properties": { "name": "snet-app", "address_prefixes": ["10.1.0.0/24"] },
      "references": { "virtual_network_name": "vnet-1" }
    }
  ]
}"#,
        )
        .unwrap();

        let err = execute(ValidateArgs { input: path, json: false }).await.unwrap_err();
        assert!(err.to_string().contains("validation failed with 1 error(s)"));
    }
}
