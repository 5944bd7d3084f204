use crate::config;
use anyhow::{Context, Result};
use hyperdoc_model::UrlBuilder;
use std::path::PathBuf;

pub fn run(config: Option<PathBuf>, segments: Vec<String>) -> Result<()> {
    let config = config::load(config)?;
    let urls = UrlBuilder::new(config.url).context("Invalid [url] configuration")?;
    println!("{}", urls.build(&segments));
    Ok(())
}
