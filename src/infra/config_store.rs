// ============================================================
// Layer 6 — Run Config Store
// ============================================================
// Reads and writes RunConfig as pretty JSON. Every field is
// optional in the file; missing fields take their defaults, so
//
//   { "max_retries": 2, "k": 5 }
//
// is a complete config. The loaded config is validated before
// it is handed out.

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::domain::config::RunConfig;

/// Load and validate a config file.
pub fn load(path: &Path) -> Result<RunConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config from '{}'", path.display()))?;

    let cfg: RunConfig = serde_json::from_str(&json)
        .with_context(|| format!("Invalid config in '{}'", path.display()))?;

    cfg.validate()
        .with_context(|| format!("Rejected config in '{}'", path.display()))?;

    tracing::debug!("Loaded run config from '{}'", path.display());
    Ok(cfg)
}

/// `path` when given, defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => load(path),
        None       => Ok(RunConfig::default()),
    }
}

pub fn save(path: &Path, cfg: &RunConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(cfg)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

    tracing::debug!("Saved run config to '{}'", path.display());
    Ok(())
}
