//! Config command - manage the F29 configuration file.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use f29_core::F29Config;

use super::default_config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Write a configuration file with the defaults
    Init {
        /// Output path for configuration file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Get a value by dotted key (e.g. "validation.coherence_error_ratio")
    Get { key: String },

    /// Set a value by dotted key; the value is parsed as JSON when possible
    Set { key: String, value: String },

    /// Show configuration file path
    Path,
}

pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let path = default_config_path();

    match args.command {
        ConfigCommand::Show => {
            if !path.exists() {
                eprintln!("{} No config file found, showing defaults.", style("ℹ").blue());
            }
            println!("{}", serde_json::to_string_pretty(&read_or_default(&path)?)?);
        }
        ConfigCommand::Init { output, force } => {
            let target = output.unwrap_or(path);
            if target.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    target.display()
                );
            }
            write_config(&target, &F29Config::default())?;
            println!(
                "{} Created configuration file at {}",
                style("✓").green(),
                target.display()
            );
        }
        ConfigCommand::Get { key } => {
            let json = serde_json::to_value(read_or_default(&path)?)?;
            let value = lookup(&json, &key)
                .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        ConfigCommand::Set { key, value } => {
            let parsed = parse_value(&value);
            let mut json = serde_json::to_value(read_or_default(&path)?)?;
            assign(&mut json, &key, parsed.clone())?;

            // Reject values the config type cannot hold
            let config: F29Config = serde_json::from_value(json)
                .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;
            write_config(&path, &config)?;

            println!("{} Set {} = {}", style("✓").green(), key, parsed);
        }
        ConfigCommand::Path => {
            println!("Configuration file: {}", path.display());
            if path.exists() {
                println!("Status: {}", style("exists").green());
            } else {
                println!("Status: {}", style("not created").yellow());
                println!();
                println!("Run 'f29 config init' to create a configuration file.");
            }
        }
    }

    Ok(())
}

fn read_or_default(path: &Path) -> anyhow::Result<F29Config> {
    if path.exists() {
        Ok(F29Config::from_file(path)?)
    } else {
        Ok(F29Config::default())
    }
}

fn write_config(path: &Path, config: &F29Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.save(path)?;
    Ok(())
}

/// JSON when it parses, otherwise a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn lookup<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(json, |current, part| current.get(part))
}

fn assign(json: &mut Value, key: &str, value: Value) -> anyhow::Result<()> {
    let (parent_key, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, key),
    };

    let mut parent = json;
    if let Some(parent_key) = parent_key {
        for part in parent_key.split('.') {
            parent = parent
                .get_mut(part)
                .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
        }
    }

    let object = parent
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Cannot set {}: parent is not an object", key))?;
    object.insert(leaf.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_dotted_key() {
        let json = serde_json::to_value(F29Config::default()).unwrap();
        assert_eq!(lookup(&json, "extraction.label_gap"), Some(&Value::from(50)));
        assert_eq!(lookup(&json, "extraction.missing"), None);
    }

    #[test]
    fn test_assign_round_trips() {
        let mut json = serde_json::to_value(F29Config::default()).unwrap();
        assign(&mut json, "validation.min_rut_len", parse_value("9")).unwrap();
        assign(&mut json, "fingerprints.cache_path", parse_value("/tmp/f29.json")).unwrap();

        let config: F29Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.validation.min_rut_len, 9);
        assert_eq!(
            config.fingerprints.cache_path,
            Some(PathBuf::from("/tmp/f29.json"))
        );
    }

    #[test]
    fn test_assign_rejects_unknown_path() {
        let mut json = serde_json::to_value(F29Config::default()).unwrap();
        assert!(assign(&mut json, "nope.value", Value::Null).is_err());
        assert!(assign(&mut json, "extraction.label_gap.deeper", Value::Null).is_err());
    }
}
