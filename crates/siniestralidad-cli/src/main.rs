//! Siniestralidad CLI - ARS claims-ratio dashboard
//!
//! Usage:
//!   siniestralidad fit                    Fit the SARIMA model
//!   siniestralidad forecast --horizon 24  Forecast the next months
//!   siniestralidad summary --year 2023    Yearly averages
//!   siniestralidad serve --port 8050      Start the JSON API

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Fit => commands::cmd_fit(&commands::load_state(&config)?),
        Commands::Forecast { horizon, json } => {
            let horizon = horizon.unwrap_or(config.forecast.default_horizon);
            commands::cmd_forecast(&commands::load_state(&config)?, horizon, json)
        }
        Commands::History { year, fitted } => {
            commands::cmd_history(&commands::load_state(&config)?, year, fitted)
        }
        Commands::Ars { year, ars } => {
            commands::cmd_ars(&commands::load_state(&config)?, year, ars)
        }
        Commands::Amounts { year, ars } => {
            commands::cmd_amounts(&commands::load_state(&config)?, year, ars)
        }
        Commands::Summary { year } => commands::cmd_summary(&commands::load_state(&config)?, year),
        Commands::Serve { host, port } => {
            let settings = commands::server_settings(&config, host, port);
            commands::cmd_serve(&config, &settings).await
        }
    }
}
