//! Name command - Apply a naming convention.

use anyhow::Result;
use clap::Args;
use forge_core::naming::{apply_naming_template, extract_slug, sanitize_terraform_name};
use forge_core::{NamingConstraints, NamingConvention, NamingTokens, PluginRegistryReader, ResourceTypeId};

use crate::document::load_registry;

#[derive(Args)]
pub struct NameArgs {
    /// Naming template, e.g. {type}-{env}-{name}
    #[arg(long, default_value = "{type}-{env}-{name}")]
    pub template: String,

    /// Resource type id (azurerm/security/key_vault) or a bare abbreviation (kv)
    #[arg(long = "type")]
    pub resource_type: String,

    /// Environment token
    #[arg(long, default_value = "dev")]
    pub env: String,

    /// Resource slug
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub org: Option<String>,

    /// Recover the slug from this full name instead of building one
    #[arg(long, conflicts_with = "name")]
    pub extract: Option<String>,

    /// Lowercase the result (bare abbreviations only)
    #[arg(long)]
    pub lowercase: bool,

    /// Strip hyphens (bare abbreviations only)
    #[arg(long)]
    pub no_hyphens: bool,

    /// Truncate to this many characters (bare abbreviations only)
    #[arg(long)]
    pub max_length: Option<usize>,
}

pub async fn execute(args: NameArgs) -> Result<()> {
    let (abbreviation, constraints) = resolve_type(&args).await?;
    let convention = NamingConvention {
        enabled: true,
        template: args.template.clone(),
        env: args.env.clone(),
        region: args.region.clone(),
        org: args.org.clone(),
    };

    let output = run(&args, &convention, &abbreviation, constraints.as_ref())?;
    println!("{}", output);
    Ok(())
}

/// Abbreviation and constraints from the resource schema when `--type` is a
/// registered type id, otherwise from the command line.
async fn resolve_type(args: &NameArgs) -> Result<(String, Option<NamingConstraints>)> {
    if args.resource_type.contains('/') {
        let type_id = ResourceTypeId::new(args.resource_type.as_str());
        let registry = load_registry(&[type_id.provider().to_string()]).await?;
        let schema = registry
            .get_resource_schema(&type_id)
            .ok_or_else(|| anyhow::anyhow!("Resource type not found: {}", type_id))?;
        let abbreviation = schema
            .caf_abbreviation
            .clone()
            .unwrap_or_else(|| type_id.resource().to_string());
        return Ok((abbreviation, schema.naming_constraints.clone()));
    }

    let constraints = NamingConstraints {
        lowercase: args.lowercase,
        no_hyphens: args.no_hyphens,
        max_length: args.max_length,
    };
    let constraints = (constraints != NamingConstraints::default()).then_some(constraints);
    Ok((args.resource_type.clone(), constraints))
}

fn run(
    args: &NameArgs,
    convention: &NamingConvention,
    abbreviation: &str,
    constraints: Option<&NamingConstraints>,
) -> Result<String> {
    let tokens = forge_core::naming::build_tokens(convention, abbreviation, "");

    if let Some(full_name) = &args.extract {
        return Ok(extract_slug(full_name, &convention.template, &tokens, constraints));
    }

    let Some(slug) = &args.name else {
        anyhow::bail!("Invalid argument: either --name or --extract is required");
    };
    let tokens = NamingTokens {
        name: slug.clone(),
        ..tokens
    };
    let name = apply_naming_template(&convention.template, &tokens, constraints);
    Ok(format!("{}\t{}", name, sanitize_terraform_name(&name)))
}
