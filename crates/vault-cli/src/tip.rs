//! # `vault tip`

use std::path::PathBuf;

use clap::Args;

use vault_core::StreamId;

use crate::open_node;

/// Arguments for tip inspection.
#[derive(Args, Debug)]
pub struct TipArgs {
    /// Node data directory.
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Stream to inspect.
    pub stream: String,
}

/// Print a stream's tip entry as JSON, or `null` for an empty stream.
pub fn run_tip(args: &TipArgs) -> anyhow::Result<()> {
    let stream = StreamId::new(&args.stream)?;
    let (log, _, _) = open_node(&args.data_dir);
    let tip = log.tip(&stream)?;
    println!("{}", serde_json::to_string_pretty(&tip)?);
    Ok(())
}
