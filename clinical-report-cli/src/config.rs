//! Configuration loading

use anyhow::{Context, Result};
use clinical_report_core::ReportConfig;
use std::fs;
use std::path::Path;

/// Load a report configuration from a TOML file
pub fn load_config(path: &Path) -> Result<ReportConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: ReportConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

/// Load `path` when given, otherwise use the tool's built-in configuration
pub fn resolve_config<F>(path: Option<&Path>, default: F) -> Result<ReportConfig>
where
    F: FnOnce() -> ReportConfig,
{
    match path {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            load_config(path)
        }
        None => {
            log::debug!("Using built-in configuration");
            Ok(default())
        }
    }
}
