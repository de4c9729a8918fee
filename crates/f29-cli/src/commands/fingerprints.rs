//! Fingerprints command - inspect or reset the known-document cache.

use clap::{Args, Subcommand};
use console::style;

use f29_core::FingerprintCache;
use f29_core::extract::rules::format_clp_amount;

use super::{fingerprint_cache_path, load_config, load_fingerprints, save_fingerprints};

/// Arguments for the fingerprints command.
#[derive(Args)]
pub struct FingerprintsArgs {
    #[command(subcommand)]
    command: FingerprintsCommand,
}

#[derive(Subcommand)]
enum FingerprintsCommand {
    /// List cached fingerprints
    List {
        /// Print the cache as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove every cached fingerprint
    Clear,
}

pub async fn run(args: FingerprintsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    match args.command {
        FingerprintsCommand::List { json } => {
            let cache = load_fingerprints(&config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cache)?);
                return Ok(());
            }

            let path = fingerprint_cache_path(&config);
            if !path.exists() {
                println!(
                    "{} No cache at {}, showing reference fingerprints.",
                    style("ℹ").blue(),
                    path.display()
                );
            }

            for entry in cache.entries() {
                println!(
                    "  [{}] {:>15}  {}",
                    entry.code,
                    format_clp_amount(entry.value),
                    entry.source.as_deref().unwrap_or("-")
                );
            }
            println!("{} fingerprints", cache.len());
        }
        FingerprintsCommand::Clear => {
            let path = save_fingerprints(&config, &FingerprintCache::new())?;
            println!(
                "{} Cleared fingerprint cache at {}",
                style("✓").green(),
                path.display()
            );
        }
    }

    Ok(())
}
