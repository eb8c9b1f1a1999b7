//! Next-cidr command - Allocate a free subnet block.

use anyhow::Result;
use clap::Args;
use forge_core::cidr;

#[derive(Args)]
pub struct NextCidrArgs {
    /// Parent address space, e.g. 10.0.0.0/16
    pub parent: String,

    /// CIDR blocks already in use (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub used: Vec<String>,

    /// Prefix length of the block to allocate
    #[arg(long, default_value_t = 24)]
    pub prefix: u8,
}

pub fn execute(args: NextCidrArgs) -> Result<()> {
    println!("{}", allocate(&args)?);
    Ok(())
}

fn allocate(args: &NextCidrArgs) -> Result<String> {
    if !cidr::is_valid_cidr(&args.parent) {
        anyhow::bail!("Invalid argument: {} is not a valid CIDR block", args.parent);
    }
    if let Some(bad) = args.used.iter().find(|c| !cidr::is_valid_cidr(c)) {
        anyhow::bail!("Invalid argument: {} is not a valid CIDR block", bad);
    }

    cidr::next_available_cidr(&args.parent, &args.used, args.prefix).ok_or_else(|| {
        anyhow::anyhow!("No free /{} block left in {}", args.prefix, args.parent)
    })
}
