//! Siniestralidad Core Library
//!
//! Shared functionality for the ARS claims-ratio dashboard:
//! - Monthly series and calendar-month types
//! - CSV loading of the monthly series and the ARS-type tables
//! - Seasonal ARIMA fitting and forecasting
//! - Pure view functions that turn filters into chart data
//! - Process-wide application state (load → fit)
//! - Configuration with embedded defaults

pub mod config;
pub mod dashboard;
pub mod error;
pub mod forecast;
pub mod optimizer;
pub mod sarima;
pub mod series;
pub mod state;
pub mod store;

/// Test utilities: synthetic series and CSV fixtures
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{DashboardConfig, DataConfig, ForecastConfig, ServerSettings};
pub use dashboard::{ArsFilter, YearFilter};
pub use error::{Error, Result};
pub use forecast::{
    fit, FitDiagnostics, FitOptions, FittedModel, ForecastEngine, ForecastPoint, ForecastResult,
};
pub use sarima::{Coefficients, ModelSpec};
pub use series::{Series, TimePoint, YearMonth};
pub use state::{AppState, ModelStatus};
pub use store::{ArsRow, ArsTable, ArsType, MonthlyRecord, SeriesStore};
