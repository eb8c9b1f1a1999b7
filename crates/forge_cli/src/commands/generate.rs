//! Generate command - Write Terraform files for a diagram.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use forge_hcl::{HclError, HclPipeline, PipelineResult};
use tracing::info;

use super::validate::print_report;
use crate::document::{load_registry, DiagramDocument};

#[derive(Args)]
pub struct GenerateArgs {
    /// Diagram document (.yaml, .yml or .json)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for the Terraform files
    #[arg(short, long, default_value = "terraform")]
    pub out: PathBuf,

    /// Generate without running diagram and network validation
    #[arg(long)]
    pub skip_validation: bool,

    /// Print the generated files as JSON instead of writing them
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    info!("Generating Terraform from {}", args.input.display());

    let document = DiagramDocument::from_file(&args.input)?;
    let result = generate(&document, args.skip_validation).await?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&result.files)?);
        return Ok(());
    }

    let written = result
        .files
        .write_to(&args.out)
        .with_context(|| format!("Failed to write Terraform files to {}", args.out.display()))?;

    println!("✅ Generated {} file(s) in {}", written.len(), args.out.display());
    for path in &written {
        println!("   - {}", path.display());
    }
    if !result.collected_variables.is_empty() {
        println!("   {} input variable(s) collected", result.collected_variables.len());
    }
    Ok(())
}

async fn generate(document: &DiagramDocument, skip_validation: bool) -> Result<PipelineResult> {
    let registry = load_registry(&document.provider_ids()).await?;
    let pipeline = HclPipeline::new(registry);
    let input = document.to_pipeline_input();

    if skip_validation {
        return Ok(pipeline.generate(&input)?);
    }

    match pipeline.validate_and_generate(&input, &document.topology) {
        Ok((result, report)) => {
            if report.warning_count() > 0 {
                println!("⚠️  {} warning(s):", report.warning_count());
                print_report(&report);
            }
            Ok(result)
        }
        Err(HclError::ValidationFailed(report)) => {
            print_report(&report);
            Err(HclError::ValidationFailed(report).into())
        }
        Err(e) => Err(e.into()),
    }
}
