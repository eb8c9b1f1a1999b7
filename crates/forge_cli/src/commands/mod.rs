//! CLI command definitions.
//!
//! Each subcommand maps to one entry point of the generation engine.

use clap::{Parser, Subcommand};

pub mod generate;
pub mod name;
pub mod next_cidr;
pub mod validate;

/// terraforge - Terraform generation from infrastructure diagrams
#[derive(Parser)]
#[command(name = "terraforge")]
#[command(version, about = "terraforge - Terraform generation from infrastructure diagrams")]
#[command(long_about = r#"
terraforge turns a diagram of typed resources into ordered, dependency-correct
Terraform configuration, validating the diagram and its network layout first.

COMMANDS:
  generate   → Validate a diagram and write Terraform files
  validate   → Check a diagram without generating anything
  next-cidr  → Find the next free subnet block in an address space
  name       → Apply a naming convention template

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  5 - Generation error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate Terraform files from a diagram document
    Generate(generate::GenerateArgs),

    /// Validate a diagram document
    Validate(validate::ValidateArgs),

    /// Allocate the next free CIDR block inside a parent range
    #[command(name = "next-cidr")]
    NextCidr(next_cidr::NextCidrArgs),

    /// Build a resource name from a naming template
    Name(name::NameArgs),
}
