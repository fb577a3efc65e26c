//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use clap::Parser;
use siniestralidad_core::test_utils::{sample_store, write_fixture};
use siniestralidad_core::{AppState, ArsFilter, ArsType, DashboardConfig, FitOptions, YearFilter};

use crate::cli::{Cli, Commands};
use crate::commands::{self, format_optional};

/// Explicit empty config so a user override on this machine is never read
fn isolated_config(dir: &Path) -> PathBuf {
    let path = dir.join("dashboard.toml");
    fs::write(&path, "").unwrap();
    path
}

fn shared_state() -> &'static AppState {
    static STATE: OnceLock<AppState> = OnceLock::new();
    STATE.get_or_init(|| AppState::from_store(sample_store(), FitOptions::default()).unwrap())
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_forecast_args() {
    let cli =
        Cli::try_parse_from(["siniestralidad", "forecast", "--horizon", "36", "--json"]).unwrap();
    match cli.command {
        Commands::Forecast { horizon, json } => {
            assert_eq!(horizon, Some(36));
            assert!(json);
        }
        _ => panic!("expected forecast command"),
    }
}

#[test]
fn test_parse_negative_horizon() {
    let cli = Cli::try_parse_from(["siniestralidad", "forecast", "--horizon", "-1"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Forecast {
            horizon: Some(-1),
            ..
        }
    ));
}

#[test]
fn test_parse_filters() {
    let cli = Cli::try_parse_from([
        "siniestralidad",
        "--data-dir",
        "/srv/ars",
        "ars",
        "--year",
        "2019",
        "--ars",
        "ars_publica",
    ])
    .unwrap();
    assert_eq!(cli.data_dir.as_deref(), Some(Path::new("/srv/ars")));
    match cli.command {
        Commands::Ars { year, ars } => {
            assert_eq!(year, YearFilter::Year(2019));
            assert_eq!(ars, ArsFilter::Only(ArsType::Publica));
        }
        _ => panic!("expected ars command"),
    }
}

#[test]
fn test_parse_rejects_bad_filter() {
    assert!(Cli::try_parse_from(["siniestralidad", "summary", "--year", "soon"]).is_err());
    assert!(Cli::try_parse_from(["siniestralidad", "ars", "--ars", "mixta"]).is_err());
}

#[test]
fn test_parse_defaults() {
    let cli = Cli::try_parse_from(["siniestralidad", "history"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::History {
            year: YearFilter::All,
            fitted: false
        }
    ));
    assert!(!cli.verbose);
    assert!(cli.config.is_none());
}

// ========== Config Tests ==========

#[test]
fn test_load_config_with_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboard.toml");
    fs::write(&path, "[forecast]\ndefault_horizon = 12\n").unwrap();

    let config = commands::load_config(Some(&path), Some(Path::new("/tmp/ars"))).unwrap();
    assert_eq!(config.forecast.default_horizon, 12);
    assert_eq!(config.data.dir, PathBuf::from("/tmp/ars"));
}

#[test]
fn test_load_config_missing_file() {
    let result = commands::load_config(Some(Path::new("/nonexistent.toml")), None);
    assert!(result.is_err());
}

#[test]
fn test_load_state_from_fixture() {
    let fixture = write_fixture();
    let config_dir = tempfile::tempdir().unwrap();
    let path = isolated_config(config_dir.path());
    let config = commands::load_config(Some(&path), Some(fixture.path())).unwrap();
    assert_eq!(config.forecast.default_horizon, 24);
    let state = commands::load_state(&config).unwrap();
    assert_eq!(state.store().series().len(), 204);
}

#[test]
fn test_load_state_missing_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = isolated_config(dir.path());
    let config = commands::load_config(Some(&path), Some(dir.path())).unwrap();
    let err = commands::load_state(&config).unwrap_err();
    assert!(err.to_string().contains("Failed to load data"));
}

#[test]
fn test_server_settings_overrides() {
    let mut config = DashboardConfig::default();
    config.server.allowed_origins = vec!["http://localhost:3000".to_string()];

    let settings = commands::server_settings(&config, Some("0.0.0.0".to_string()), None);
    assert_eq!(settings.addr(), "0.0.0.0:8050");
    assert_eq!(settings.allowed_origins, config.server.allowed_origins);

    let settings = commands::server_settings(&config, None, Some(9000));
    assert_eq!(settings.addr(), "127.0.0.1:9000");
}

// ========== Command Tests ==========

#[test]
fn test_cmd_fit() {
    assert!(commands::cmd_fit(shared_state()).is_ok());
}

#[test]
fn test_cmd_forecast() {
    let state = shared_state();
    assert!(commands::cmd_forecast(state, 24, false).is_ok());
    assert!(commands::cmd_forecast(state, 24, true).is_ok());
    assert!(commands::cmd_forecast(state, 0, false).is_ok());
}

#[test]
fn test_cmd_forecast_caps_huge_horizon() {
    assert!(commands::cmd_forecast(shared_state(), i64::MAX, true).is_ok());
    assert!(commands::cmd_forecast(shared_state(), 61, false).is_ok());
}

#[test]
fn test_cmd_forecast_negative_horizon() {
    let err = commands::cmd_forecast(shared_state(), -1, false).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid horizon"));
}

#[test]
fn test_cmd_history() {
    let state = shared_state();
    assert!(commands::cmd_history(state, YearFilter::All, false).is_ok());
    assert!(commands::cmd_history(state, YearFilter::Year(2019), true).is_ok());
    assert!(commands::cmd_history(state, YearFilter::Year(1990), false).is_ok());
}

#[test]
fn test_cmd_ars_and_amounts() {
    let state = shared_state();
    assert!(commands::cmd_ars(state, YearFilter::All, ArsFilter::All).is_ok());
    let privada = ArsFilter::Only(ArsType::Privada);
    assert!(commands::cmd_amounts(state, YearFilter::Year(2020), privada).is_ok());
}

#[test]
fn test_cmd_summary() {
    let state = shared_state();
    assert!(commands::cmd_summary(state, YearFilter::All).is_ok());
    assert!(commands::cmd_summary(state, YearFilter::Year(1990)).is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_format_optional() {
    assert_eq!(format_optional(Some(1.23456), 2), "1.23");
    assert_eq!(format_optional(None, 2), "-");
}
