//! # `vault keygen`

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;

use vault_crypto::{LocalKeyProvider, KeyProvider};

/// Arguments for key generation.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Where to write the hex-encoded seed.
    #[arg(long)]
    pub out: PathBuf,

    /// Overwrite an existing seed file.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

/// Generate a fresh Ed25519 seed file and print the public identity.
pub fn run_keygen(args: &KeygenArgs) -> anyhow::Result<()> {
    if args.out.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            args.out.display()
        );
    }

    let seed = vault_crypto::generate_seed();
    let hex: String = seed.iter().map(|b| format!("{b:02x}")).collect();
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.out, &hex)
        .with_context(|| format!("writing seed file {}", args.out.display()))?;

    // Load through the provider so the printed identity is exactly what
    // the anchor service will see.
    let provider = LocalKeyProvider::from_seed(&seed);
    let public_key = provider.public_key()?;
    let output = serde_json::json!({
        "seed_file": args.out.display().to_string(),
        "public_key": public_key.to_hex(),
        "vault_fingerprint": public_key.fingerprint().to_hex(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
