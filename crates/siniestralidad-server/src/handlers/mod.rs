//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod charts;
pub mod forecast;
pub mod series;
pub mod status;

// Re-export all handlers for use in router
pub use charts::*;
pub use forecast::*;
pub use series::*;
pub use status::*;

use serde::Deserialize;
use siniestralidad_core::{ArsFilter, YearFilter};

use crate::AppError;

/// Dropdown filters shared by the chart endpoints
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    /// "all" or a year
    pub year: Option<String>,
    /// "all", "ars_publica", "ars_privada" or "ars_autogestion"
    pub ars: Option<String>,
}

impl FilterQuery {
    pub fn year(&self) -> Result<YearFilter, AppError> {
        YearFilter::parse_optional(self.year.as_deref()).map_err(AppError::from_core)
    }

    pub fn ars(&self) -> Result<ArsFilter, AppError> {
        ArsFilter::parse_optional(self.ars.as_deref()).map_err(AppError::from_core)
    }
}
