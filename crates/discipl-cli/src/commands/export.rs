//! `discipl export`: re-export a channel or claim from a bundle.

use clap::Args;
use std::path::PathBuf;

use super::bundle;
use crate::config::DisciplConfig;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Linked-data bundle produced by an export.
    #[arg(short, long)]
    pub bundle: PathBuf,

    /// DID or link to export from.
    #[arg(short, long)]
    pub from: String,

    /// Override the maximum depth of nested claims.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Print a verifiable presentation instead of linked data.
    #[arg(long)]
    pub vp: bool,
}

pub async fn run(args: &ExportArgs, config: &DisciplConfig) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(depth) = args.max_depth {
        config.core.max_export_depth = depth;
    }
    let core = bundle::mirror_file(&args.bundle, &config).await?;

    let output = if args.vp {
        serde_json::to_value(core.export_vp(&args.from, None).await?)?
    } else {
        core.export_ld(&args.from, None).await?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
