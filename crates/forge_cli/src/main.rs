//! terraforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 5: Generation error

use std::process::ExitCode;

use clap::Parser;
use forge_hcl::HclError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod document;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const GENERATION_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "forge_cli=debug,forge_core=debug,forge_hcl=debug,forge_azure=debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Logging may already be initialized by an embedding process.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::NextCidr(args) => commands::next_cidr::execute(args),
        Commands::Name(args) => commands::name::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<HclError>() {
        return match err {
            HclError::ValidationFailed(_) => ExitCodes::VALIDATION_FAILURE,
            HclError::UnsupportedFormat(_) => ExitCodes::INVALID_ARGS,
            HclError::Io(_) | HclError::Yaml(_) | HclError::Json(_) => ExitCodes::GENERAL_ERROR,
            HclError::Registry(_) | HclError::Generation(_) | HclError::CircularDependency(_) => {
                ExitCodes::GENERATION_ERROR
            }
        };
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("invalid argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else if msg.contains("plugin") || msg.contains("generation") {
        ExitCodes::GENERATION_ERROR
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
