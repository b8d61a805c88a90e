//! `discipl verify`: check an attestation against an exported bundle.

use clap::Args;
use std::path::PathBuf;

use discipl_core::{Candidate, Link};

use super::bundle;
use crate::config::DisciplConfig;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Linked-data bundle produced by an export.
    #[arg(short, long)]
    pub bundle: PathBuf,

    /// Predicate of the attestation, e.g. `agree`.
    #[arg(short, long)]
    pub predicate: String,

    /// Link of the attested claim.
    #[arg(short, long)]
    pub link: String,

    /// DIDs that may have attested, tried in order.
    #[arg(long = "candidate", required = true)]
    pub candidates: Vec<String>,
}

pub async fn run(args: &VerifyArgs, config: &DisciplConfig) -> anyhow::Result<()> {
    let core = bundle::mirror_file(&args.bundle, config).await?;
    let link = Link::parse(&args.link)?;
    let candidates: Vec<Candidate> = args
        .candidates
        .iter()
        .map(|c| Candidate::from(c.as_str()))
        .collect();

    match core.verify(&args.predicate, &link, &candidates, None).await? {
        Some(did) => println!("{}", did),
        None => println!("not attested"),
    }
    Ok(())
}
