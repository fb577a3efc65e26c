//! Monthly series handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use super::FilterQuery;
use crate::AppError;
use siniestralidad_core::dashboard::{in_sample_chart, siniestralidad_line, LineChart};
use siniestralidad_core::AppState;

/// GET /api/series?year= - Monthly claims ratio
pub async fn series(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<LineChart>, AppError> {
    let year = params.year()?;
    Ok(Json(siniestralidad_line(state.store(), year)))
}

/// GET /api/series/fitted - Observed series with in-sample fitted values
pub async fn fitted_series(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LineChart>, AppError> {
    let chart = in_sample_chart(state.engine()).map_err(AppError::from_core)?;
    Ok(Json(chart))
}
