//! Process-wide application state
//!
//! Built once by loading the store and fitting the forecast engine, then
//! only read. The server shares it behind an `Arc` without locks.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::error::{Error, Result};
use crate::forecast::{FitOptions, FittedModel, ForecastEngine};
use crate::sarima::ModelSpec;
use crate::store::SeriesStore;

/// Reliability of the fitted model, attached to every forecast response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub converged: bool,
    pub fallback: bool,
    pub warning: Option<String>,
}

impl ModelStatus {
    pub fn from_model(model: &FittedModel) -> Self {
        let diagnostics = model.diagnostics();
        let warning = if !diagnostics.converged {
            Some(format!(
                "Model did not converge after {} iterations; forecasts may be unreliable",
                diagnostics.iterations
            ))
        } else if diagnostics.fallback {
            Some(
                "Differenced series is constant; forecasts repeat the seasonal pattern"
                    .to_string(),
            )
        } else {
            None
        };

        Self {
            converged: diagnostics.converged,
            fallback: diagnostics.fallback,
            warning,
        }
    }
}

#[derive(Debug)]
pub struct AppState {
    config: DashboardConfig,
    store: SeriesStore,
    engine: ForecastEngine,
    status: ModelStatus,
}

impl AppState {
    /// Load the CSV tables and fit the model
    ///
    /// Non-convergence is kept as a degraded status; any other error aborts.
    pub fn initialize(config: &DashboardConfig) -> Result<Self> {
        let store = SeriesStore::load(&config.data)?;
        Self::build(config.clone(), store)
    }

    /// Fit against an already loaded store
    pub fn from_store(store: SeriesStore, options: FitOptions) -> Result<Self> {
        let mut config = DashboardConfig::default();
        config.forecast.max_iterations = options.max_iterations;
        config.forecast.tolerance = options.tolerance;
        Self::build(config, store)
    }

    fn build(config: DashboardConfig, store: SeriesStore) -> Result<Self> {
        let mut engine =
            ForecastEngine::new(ModelSpec::claims_ratio(), config.forecast.fit_options());

        match engine.fit(store.series().clone()) {
            Ok(()) => {}
            Err(Error::NonConvergence(model)) => {
                warn!(
                    iterations = model.diagnostics().iterations,
                    css = model.diagnostics().css,
                    "Model did not converge, serving degraded forecasts"
                );
            }
            Err(e) => return Err(e),
        }

        let status = ModelStatus::from_model(engine.model()?);
        info!(
            spec = %engine.spec(),
            months = store.series().len(),
            converged = status.converged,
            "Application state ready"
        );

        Ok(Self {
            config,
            store,
            engine,
            status,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    pub fn status(&self) -> &ModelStatus {
        &self.status
    }

    /// The fitted model; always present once the state is built
    pub fn model(&self) -> Result<&FittedModel> {
        self.engine.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_store, write_fixture};

    #[test]
    fn test_from_store_fits_model() {
        let state = AppState::from_store(sample_store(), FitOptions::default()).unwrap();
        assert!(state.engine().is_fitted());
        assert_eq!(state.model().unwrap().series().len(), 204);
        assert_eq!(state.config().forecast.default_horizon, 24);
    }

    #[test]
    fn test_non_convergence_is_degraded_not_fatal() {
        let options = FitOptions {
            max_iterations: 1,
            ..Default::default()
        };
        let state = AppState::from_store(sample_store(), options).unwrap();
        assert!(!state.status().converged);
        assert!(state.status().warning.is_some());
        assert_eq!(state.engine().forecast(12).unwrap().len(), 12);
    }

    #[test]
    fn test_initialize_from_csv() {
        let fixture = write_fixture();
        let config = DashboardConfig::default().with_data_dir(fixture.path());
        let state = AppState::initialize(&config).unwrap();
        assert_eq!(state.store().series().len(), 204);
        assert_eq!(state.store().latest_year(), Some(2023));
    }

    #[test]
    fn test_initialize_fails_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::default().with_data_dir(dir.path());
        assert!(matches!(AppState::initialize(&config), Err(Error::Import(_))));
    }

    #[test]
    fn test_status_from_converged_model() {
        let state = AppState::from_store(sample_store(), FitOptions::default()).unwrap();
        let status = ModelStatus::from_model(state.model().unwrap());
        assert_eq!(&status, state.status());
        let clean = status.converged && !status.fallback;
        assert_eq!(clean, status.warning.is_none());
    }
}
