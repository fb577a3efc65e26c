//! Health, dropdown options and model description handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppError;
use siniestralidad_core::dashboard::{ars_options, year_options, FilterOption};
use siniestralidad_core::{AppState, Coefficients, FitDiagnostics, ModelStatus};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub months: usize,
    pub model_converged: bool,
}

/// GET /api/health - Liveness and model state
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        months: state.store().series().len(),
        model_converged: state.status().converged,
    })
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub years: Vec<FilterOption>,
    pub ars: Vec<FilterOption>,
}

/// GET /api/options - Year and ARS-type dropdown entries
pub async fn options(State(state): State<Arc<AppState>>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        years: year_options(state.store()),
        ars: ars_options(),
    })
}

#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub spec: String,
    pub order: (usize, usize, usize),
    pub seasonal_order: (usize, usize, usize, usize),
    pub coefficients: Coefficients,
    pub sigma2: f64,
    pub diagnostics: FitDiagnostics,
    pub status: ModelStatus,
}

/// GET /api/model - Fitted coefficients and diagnostics
pub async fn model(State(state): State<Arc<AppState>>) -> Result<Json<ModelResponse>, AppError> {
    let model = state.model().map_err(AppError::from_core)?;
    let spec = model.spec();

    Ok(Json(ModelResponse {
        spec: spec.to_string(),
        order: spec.order(),
        seasonal_order: spec.seasonal_order(),
        coefficients: model.coefficients().clone(),
        sigma2: model.sigma2(),
        diagnostics: model.diagnostics().clone(),
        status: state.status().clone(),
    }))
}
