//! Implementation of the `watchtower config` command.

use anyhow::{Context, Result};
use std::path::Path;

use super::load_config;
use crate::domain::models::Config;

pub fn execute(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    println!("{}", render(&config, json)?);
    Ok(())
}

fn render(config: &Config, json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(config).context("Failed to serialize config as JSON")
    } else {
        serde_yaml::to_string(config).context("Failed to serialize config as YAML")
    }
}
