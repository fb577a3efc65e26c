//! Siniestralidad Web Server
//!
//! Axum-based JSON API for the claims-ratio dashboard. Every endpoint is a
//! read-only `GET` over the shared [`AppState`], which is built (store loaded,
//! model fitted) before the server starts and never mutated afterwards.
//!
//! - Restrictive CORS policy (same-origin unless origins are configured)
//! - Request tracing
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use siniestralidad_core::{AppState, Error as CoreError, ServerSettings};

mod handlers;

/// Server configuration
#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            allowed_origins: settings.allowed_origins.clone(),
        }
    }
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>, config: ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/options", get(handlers::options))
        .route("/model", get(handlers::model))
        // Monthly series
        .route("/series", get(handlers::series))
        .route("/series/fitted", get(handlers::fitted_series))
        // Yearly ARS tables
        .route("/siniestralidad", get(handlers::siniestralidad))
        .route("/amounts", get(handlers::amounts))
        .route("/summary", get(handlers::summary))
        // Forecast
        .route("/forecast", get(handlers::forecast));

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server on the configured address and CORS origins
pub async fn serve(state: Arc<AppState>, settings: &ServerSettings) -> anyhow::Result<()> {
    if let Some(warning) = &state.status().warning {
        warn!("⚠️  {}", warning);
    }

    let app = create_router(state, ServerConfig::from(settings));
    let addr = settings.addr();

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error to its status: caller mistakes are 400, missing
    /// data is 404, everything else is a sanitized 500
    pub fn from_core(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(_) => Self::not_found(&err.to_string()),
            err if err.is_caller_error() => Self::bad_request(&err.to_string()),
            err => err.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
