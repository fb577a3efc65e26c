//! Dashboard configuration
//!
//! ## Configuration Resolution
//!
//! 1. An explicit path (CLI `--config`), which must exist
//! 2. The override in the data dir (~/.local/share/siniestralidad/config/dashboard.toml)
//! 3. The embedded defaults (compiled into binary)
//!
//! Sections missing from a file take their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::forecast::FitOptions;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/dashboard.toml");

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub forecast: ForecastConfig,
    pub server: ServerSettings,
}

/// Location of the CSV tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub monthly_file: String,
    pub ingresos_file: String,
    pub gastos_file: String,
    pub siniestralidad_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            monthly_file: "IngresosGastosSiniestralidad_SerieMensual.csv".to_string(),
            ingresos_file: "Ingresos_TiposARS.csv".to_string(),
            gastos_file: "Gastos_TiposARS.csv".to_string(),
            siniestralidad_file: "Siniestralidad_TiposARS.csv".to_string(),
        }
    }
}

impl DataConfig {
    /// Default file names inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn monthly_path(&self) -> PathBuf {
        self.dir.join(&self.monthly_file)
    }

    pub fn ingresos_path(&self) -> PathBuf {
        self.dir.join(&self.ingresos_file)
    }

    pub fn gastos_path(&self) -> PathBuf {
        self.dir.join(&self.gastos_file)
    }

    pub fn siniestralidad_path(&self) -> PathBuf {
        self.dir.join(&self.siniestralidad_file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub default_horizon: i64,
    pub max_horizon: i64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        let options = FitOptions::default();
        Self {
            default_horizon: 24,
            max_horizon: 60,
            max_iterations: options.max_iterations,
            tolerance: options.tolerance,
        }
    }
}

impl ForecastConfig {
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }

    /// Cap a requested horizon at `max_horizon`; negative values pass
    /// through so the engine can reject them
    pub fn cap_horizon(&self, horizon: i64) -> i64 {
        horizon.min(self.max_horizon.max(0))
    }

    /// Clamp a requested horizon to `[0, max_horizon]`
    pub fn clamp_horizon(&self, horizon: i64) -> i64 {
        self.cap_horizon(horizon).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// CORS origins allowed to call the API (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8050,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("siniestralidad").join("config").join("dashboard.toml"))
}

impl DashboardConfig {
    /// Load configuration (explicit path, then override, then embedded)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Self::embedded(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config");
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        Self::from_toml(&content)
    }

    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Parse and validate TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the CSV directory (CLI `--data-dir`)
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data.dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let forecast = &self.forecast;
        if forecast.max_horizon < 0 {
            return Err(Error::Config(format!(
                "max_horizon must be non-negative (got {})",
                forecast.max_horizon
            )));
        }
        if !(0..=forecast.max_horizon).contains(&forecast.default_horizon) {
            return Err(Error::Config(format!(
                "default_horizon {} outside [0, {}]",
                forecast.default_horizon, forecast.max_horizon
            )));
        }
        if forecast.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be positive".into()));
        }
        if !(forecast.tolerance.is_finite() && forecast.tolerance > 0.0) {
            return Err(Error::Config(format!(
                "tolerance must be a positive number (got {})",
                forecast.tolerance
            )));
        }
        Ok(())
    }
}
