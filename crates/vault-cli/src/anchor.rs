//! # `vault anchor`

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use vault_anchor::{AnchorRequest, AnchorService};
use vault_crypto::FileKeyProvider;

use crate::open_node;

/// Arguments for anchor writes.
#[derive(Args, Debug)]
pub struct AnchorArgs {
    /// Node data directory (log/, cas/, keys/).
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Seed file for the vault key.
    #[arg(long)]
    pub key_file: PathBuf,

    /// Request body file; `-` or absent reads stdin.
    #[arg(long)]
    pub request: Option<PathBuf>,
}

fn read_request(args: &AnchorArgs) -> anyhow::Result<AnchorRequest> {
    let text = match &args.request {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("reading request body {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let value: serde_json::Value =
        serde_json::from_str(&text).context("request body is not JSON")?;
    Ok(AnchorRequest::from_value(&value)?)
}

/// Submit an anchor write and print the sealed receipt.
pub fn run_anchor(args: &AnchorArgs) -> anyhow::Result<()> {
    let request = read_request(args)?;
    let (log, store, archive) = open_node(&args.data_dir);
    let provider = FileKeyProvider::from_path(&args.key_file)?;
    let service = AnchorService::init(Box::new(provider), log, store, archive)?;

    let receipt = service.write_anchor(&request)?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}
