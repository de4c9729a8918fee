//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod fingerprints;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use f29_core::{F29Config, FingerprintCache, SuperParser};

/// Directory holding the config file and the fingerprint cache.
pub(crate) fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("f29")
}

pub(crate) fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Explicit config file, else the default one when it exists, else defaults.
pub(crate) fn load_config(config_path: Option<&str>) -> anyhow::Result<F29Config> {
    if let Some(path) = config_path {
        return Ok(F29Config::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config {}", default_path.display());
        Ok(F29Config::from_file(&default_path)?)
    } else {
        Ok(F29Config::default())
    }
}

pub(crate) fn fingerprint_cache_path(config: &F29Config) -> PathBuf {
    config
        .fingerprints
        .cache_path
        .clone()
        .unwrap_or_else(|| config_dir().join("fingerprints.json"))
}

/// The saved cache, or the reference fingerprints when nothing was saved yet.
pub(crate) fn load_fingerprints(config: &F29Config) -> anyhow::Result<FingerprintCache> {
    let path = fingerprint_cache_path(config);
    if path.exists() {
        Ok(FingerprintCache::load(&path)?)
    } else {
        Ok(FingerprintCache::with_reference())
    }
}

pub(crate) fn build_parser(config: &F29Config) -> anyhow::Result<SuperParser> {
    let fingerprints = load_fingerprints(config)?;
    Ok(SuperParser::from_config(config.clone()).with_fingerprints(fingerprints))
}

/// Persist the parser's cache, creating the parent directory if needed.
pub(crate) fn save_fingerprints(config: &F29Config, cache: &FingerprintCache) -> anyhow::Result<PathBuf> {
    let path = fingerprint_cache_path(config);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    cache.save(&path)?;
    Ok(path)
}
