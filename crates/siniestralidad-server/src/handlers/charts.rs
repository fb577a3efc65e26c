//! Per-ARS-type chart and summary handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use super::FilterQuery;
use crate::AppError;
use siniestralidad_core::dashboard::{
    amounts_by_ars, siniestralidad_by_ars, trend_summary, AmountCharts, BarChart, TrendSummary,
};
use siniestralidad_core::AppState;

/// GET /api/siniestralidad?year=&ars= - Claims ratio by ARS type
pub async fn siniestralidad(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<BarChart>, AppError> {
    let (year, ars) = (params.year()?, params.ars()?);
    Ok(Json(siniestralidad_by_ars(state.store(), year, ars)))
}

/// GET /api/amounts?year=&ars= - Stacked gastos and ingresos by ARS type
pub async fn amounts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<AmountCharts>, AppError> {
    let (year, ars) = (params.year()?, params.ars()?);
    Ok(Json(amounts_by_ars(state.store(), year, ars)))
}

/// GET /api/summary?year= - Yearly averages (latest year when "all")
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterQuery>,
) -> Result<Json<TrendSummary>, AppError> {
    let year = params.year()?;
    let summary = trend_summary(state.store(), year).map_err(AppError::from_core)?;
    Ok(Json(summary))
}
