//! `discipl inspect`: show the parts of a link or DID.

use clap::Args;

use discipl_core::{Did, Link};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// A `link:discipl:...` or `did:discipl:...` address.
    pub address: String,
}

pub fn run(args: &InspectArgs) -> anyhow::Result<()> {
    println!("{}", describe(&args.address)?);
    Ok(())
}

fn describe(address: &str) -> anyhow::Result<String> {
    if let Ok(link) = Link::parse(address) {
        return Ok(format!(
            "Link\n  connector: {}\n  reference: {}",
            link.connector(),
            link.reference()
        ));
    }
    match Did::parse(address) {
        Ok(did) => Ok(format!(
            "DID\n  connector: {}\n  pubkey:    {}",
            did.connector(),
            did.pubkey()
        )),
        Err(e) => anyhow::bail!("{} is neither a link nor a DID: {}", address, e),
    }
}
