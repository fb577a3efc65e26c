//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use siniestralidad_core::{ArsFilter, YearFilter};

/// Siniestralidad - claims-ratio dashboard for the ARS of the contributory regime
#[derive(Parser)]
#[command(name = "siniestralidad")]
#[command(about = "ARS claims-ratio series, charts and SARIMA forecasts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the CSV tables (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit the model and show coefficients and diagnostics
    Fit,

    /// Forecast the months following the series
    Forecast {
        /// Months ahead (defaults to the configured horizon, capped at max_horizon)
        #[arg(long, allow_negative_numbers = true)]
        horizon: Option<i64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the monthly claims ratio
    History {
        /// "all" or a year
        #[arg(short, long, default_value = "all")]
        year: YearFilter,

        /// Include the in-sample fitted values
        #[arg(long)]
        fitted: bool,
    },

    /// Show the claims ratio by ARS type
    Ars {
        /// "all" or a year
        #[arg(short, long, default_value = "all")]
        year: YearFilter,

        /// "all", ars_publica, ars_privada or ars_autogestion
        #[arg(short, long, default_value = "all")]
        ars: ArsFilter,
    },

    /// Show gastos and ingresos by ARS type
    Amounts {
        /// "all" or a year
        #[arg(short, long, default_value = "all")]
        year: YearFilter,

        /// "all", ars_publica, ars_privada or ars_autogestion
        #[arg(short, long, default_value = "all")]
        ars: ArsFilter,
    },

    /// Show the yearly averages (latest year when "all")
    Summary {
        /// "all" or a year
        #[arg(short, long, default_value = "all")]
        year: YearFilter,
    },

    /// Start the web server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}
