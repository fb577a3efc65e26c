//! Server command implementation

use std::sync::Arc;

use anyhow::Result;
use siniestralidad_core::{DashboardConfig, ServerSettings};

use super::load_state;

/// Server settings from config with `--host` / `--port` applied
pub fn server_settings(
    config: &DashboardConfig,
    host: Option<String>,
    port: Option<u16>,
) -> ServerSettings {
    let mut settings = config.server.clone();
    if let Some(host) = host {
        settings.host = host;
    }
    if let Some(port) = port {
        settings.port = port;
    }
    settings
}

pub async fn cmd_serve(config: &DashboardConfig, settings: &ServerSettings) -> Result<()> {
    println!("🚀 Starting siniestralidad API server...");
    println!("   Data: {}", config.data.dir.display());
    println!("   Listening: http://{}/api", settings.addr());
    if !settings.allowed_origins.is_empty() {
        println!("   CORS origins: {}", settings.allowed_origins.join(", "));
    }
    println!(
        "   Forecast horizon: {} (max {})",
        config.forecast.default_horizon, config.forecast.max_horizon
    );

    let state = load_state(config)?;
    if let Some(warning) = &state.status().warning {
        println!("   ⚠️  {}", warning);
    }
    println!();
    println!("   Press Ctrl+C to stop");

    siniestralidad_server::serve(Arc::new(state), settings).await?;

    Ok(())
}
