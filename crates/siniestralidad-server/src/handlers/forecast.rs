//! Forecast handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::AppError;
use siniestralidad_core::dashboard::{forecast_chart, ForecastChart};
use siniestralidad_core::AppState;

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    /// Months ahead; clamped to [0, max_horizon]
    pub horizon: Option<String>,
}

/// GET /api/forecast?horizon= - History plus a fresh forecast
pub async fn forecast(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<ForecastChart>, AppError> {
    let settings = &state.config().forecast;
    let requested = match params.horizon.as_deref().map(str::trim) {
        None | Some("") => settings.default_horizon,
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::bad_request("horizon must be an integer number of months"))?,
    };

    let chart = forecast_chart(state.engine(), state.store(), requested, settings)
        .map_err(AppError::from_core)?;
    debug!(requested, horizon = chart.horizon, "Forecast served");

    Ok(Json(chart))
}
