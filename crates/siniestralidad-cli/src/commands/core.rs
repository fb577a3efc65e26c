//! Shared utilities
//!
//! This module contains:
//! - `load_config` - Resolve the dashboard config and apply CLI overrides
//! - `load_state` - Load the CSV tables and fit the model

use std::path::Path;

use anyhow::{Context, Result};
use siniestralidad_core::{AppState, DashboardConfig};

/// Config from `--config` (or the override/embedded defaults), with `--data-dir` applied
pub fn load_config(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<DashboardConfig> {
    let config = DashboardConfig::load(config_path).context("Failed to load config")?;
    Ok(match data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

/// Load the store and fit the model; non-convergence only degrades the state
pub fn load_state(config: &DashboardConfig) -> Result<AppState> {
    AppState::initialize(config)
        .with_context(|| format!("Failed to load data from {}", config.data.dir.display()))
}
