use anyhow::{Context, Result};
use hyperdoc_builder::ContextConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_FILE: &str = "hyperdoc.toml";

/// Load `path`, or `./hyperdoc.toml` when no path is given and it exists,
/// or fall back to `http://localhost`.
pub fn load(path: Option<PathBuf>) -> Result<ContextConfig> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_FILE).is_file() => PathBuf::from(DEFAULT_FILE),
        None => {
            debug!("no configuration file, using defaults");
            return Ok(ContextConfig::default());
        }
    };
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
    let config = parse(&content).with_context(|| format!("Failed to parse {:?}", path))?;
    debug!(path = ?path, host = %config.url.host, "loaded configuration");
    Ok(config)
}

pub fn parse(content: &str) -> Result<ContextConfig> {
    Ok(toml::from_str(content)?)
}
