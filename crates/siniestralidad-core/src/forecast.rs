//! Seasonal ARIMA fitting and forecasting
//!
//! [`fit`] estimates the ARMA coefficients of the differenced series by
//! conditional sum of squares. The resulting [`FittedModel`] is immutable
//! and answers in-sample and out-of-sample queries by recomputing from its
//! training data on every call.
//!
//! [`ForecastEngine`] wraps the model in the two-state lifecycle the
//! application uses: unfitted until the single `fit`, fitted forever after.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::optimizer::{nelder_mead, NelderMeadConfig};
use crate::sarima::{difference, integrate_step, start_params, Coefficients, ModelSpec};
use crate::series::{Series, TimePoint, YearMonth};

/// z-score of a two-sided 95% interval
const Z_95: f64 = 1.959_963_984_540_054;

/// Output capacity reserved up front; longer horizons grow the buffer
const MAX_PREALLOCATED: u64 = 4096;

/// Below this variance the differenced series is treated as constant
const DEGENERATE_VARIANCE: f64 = 1e-12;

/// Optimizer settings; they never change the model structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, serde::Deserialize)]
pub struct FitOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostics {
    /// Nelder–Mead iterations used
    pub iterations: usize,
    pub converged: bool,
    /// Coefficients were forced to zero instead of estimated
    pub fallback: bool,
    /// Residuals entering the objective
    pub n_obs: usize,
    pub css: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

/// A model fitted to one series
#[derive(Debug, Clone)]
pub struct FittedModel {
    series: Series,
    spec: ModelSpec,
    coefficients: Coefficients,
    sigma2: f64,
    diagnostics: FitDiagnostics,
}

/// One forecast month with its 95% prediction interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: YearMonth,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<YearMonth> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Fit `spec` to `series`
///
/// The series is copied into the returned model. On optimizer failure the
/// best-effort model comes back inside [`Error::NonConvergence`].
pub fn fit(series: &Series, spec: &ModelSpec, options: &FitOptions) -> Result<FittedModel> {
    spec.validate()?;

    let required = spec.min_observations();
    if series.len() < required {
        return Err(Error::InsufficientData {
            required,
            actual: series.len(),
        });
    }

    let y = series.values();
    let w = difference(&y, &spec.differencing_polynomial());
    let start = spec.ar_degree();
    let n_eff = w.len() - start;

    debug!(
        spec = %spec,
        observations = y.len(),
        differenced = w.len(),
        "Fitting seasonal ARIMA"
    );

    let objective = |params: &[f64]| {
        let coefficients = Coefficients::from_unconstrained(spec, params);
        coefficients.expand(spec.period).css(&w, start) / n_eff as f64
    };

    let (coefficients, iterations, converged, fallback) = if variance(&w) <= DEGENERATE_VARIANCE {
        debug!("Differenced series is constant, skipping optimizer");
        (Coefficients::zeros(spec), 0, true, true)
    } else {
        let result = nelder_mead(
            objective,
            &start_params(spec, &w),
            NelderMeadConfig {
                max_iter: options.max_iterations,
                tolerance: options.tolerance,
                ..Default::default()
            },
        );
        if result.optimal_value.is_finite() {
            (
                Coefficients::from_unconstrained(spec, &result.optimal_point),
                result.iterations,
                result.converged,
                false,
            )
        } else {
            warn!("Objective not finite at optimum, falling back to zero coefficients");
            (Coefficients::zeros(spec), result.iterations, false, true)
        }
    };

    let css = coefficients.expand(spec.period).css(&w, start);
    let model = FittedModel::new(
        series.clone(),
        *spec,
        coefficients,
        css,
        n_eff,
        iterations,
        converged,
        fallback,
    );

    if converged {
        info!(
            spec = %spec,
            iterations,
            css = model.diagnostics.css,
            aic = model.diagnostics.aic,
            "Model fitted"
        );
        debug!(coefficients = ?model.coefficients, sigma2 = model.sigma2, "Estimated coefficients");
        Ok(model)
    } else {
        Err(Error::NonConvergence(Box::new(model)))
    }
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

impl FittedModel {
    #[allow(clippy::too_many_arguments)]
    fn new(
        series: Series,
        spec: ModelSpec,
        coefficients: Coefficients,
        css: f64,
        n_eff: usize,
        iterations: usize,
        converged: bool,
        fallback: bool,
    ) -> Self {
        let n = n_eff as f64;
        let sigma2 = css / n;
        let k = (spec.n_coefficients() + 1) as f64;
        // Floor keeps the likelihood finite for an exact fit
        let log_likelihood =
            -n / 2.0 * ((2.0 * std::f64::consts::PI * sigma2.max(1e-300)).ln() + 1.0);

        Self {
            series,
            spec,
            coefficients,
            sigma2,
            diagnostics: FitDiagnostics {
                iterations,
                converged,
                fallback,
                n_obs: n_eff,
                css,
                log_likelihood,
                aic: -2.0 * log_likelihood + 2.0 * k,
                bic: -2.0 * log_likelihood + k * n.ln(),
            },
        }
    }

    /// Training series
    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    /// One-step-ahead reconstruction of the training series
    ///
    /// One point per training month. The first `deg Δ` months have no
    /// differenced value: month 0 repeats itself and the others repeat the
    /// previous observation.
    pub fn predict_in_sample(&self) -> Vec<TimePoint> {
        let y = self.series.values();
        let delta = self.spec.differencing_polynomial();
        let degree = delta.len() - 1;
        let w = difference(&y, &delta);
        let (w_hat, _) = self.coefficients.expand(self.spec.period).one_step(&w);

        self.series
            .points()
            .iter()
            .enumerate()
            .map(|(t, point)| {
                let value = if t >= degree {
                    integrate_step(w_hat[t - degree], &y[..t], &delta)
                } else if t == 0 {
                    y[0]
                } else {
                    y[t - 1]
                };
                TimePoint::new(point.date, value)
            })
            .collect()
    }

    /// Forecast the `horizon` months following the training series
    pub fn forecast(&self, horizon: i64) -> Result<ForecastResult> {
        if horizon < 0 {
            return Err(Error::InvalidHorizon(horizon));
        }
        if horizon == 0 {
            return Ok(ForecastResult { points: Vec::new() });
        }

        let last = self.series.end();
        let steps = horizon as u64;
        // Every forecast date must exist on the calendar
        if last.checked_add_months(steps).is_none() {
            return Err(Error::InvalidHorizon(horizon));
        }

        let delta = self.spec.differencing_polynomial();
        let polys = self.coefficients.expand(self.spec.period);

        let mut y = self.series.values();
        let mut w = difference(&y, &delta);
        let (_, mut shocks) = polys.one_step(&w);

        let mut psi = polys.psi_iter(&delta);
        let mut cumulative = 0.0;
        let mut points = Vec::with_capacity(steps.min(MAX_PREALLOCATED) as usize);

        for step in 1..=steps {
            let w_next = polys.predict_next(&w, &shocks);
            w.push(w_next);
            shocks.push(0.0);

            let value = integrate_step(w_next, &y, &delta);
            y.push(value);

            let weight = psi.next().unwrap_or(0.0);
            cumulative += weight * weight;
            let half_width = Z_95 * (self.sigma2 * cumulative).sqrt();
            let date = last
                .checked_add_months(step)
                .ok_or(Error::InvalidHorizon(horizon))?;
            points.push(ForecastPoint {
                date,
                value,
                lower: value - half_width,
                upper: value + half_width,
            });
        }

        debug!(horizon, "Forecast computed");
        Ok(ForecastResult { points })
    }
}

#[derive(Debug)]
enum EngineState {
    Unfitted,
    Fitted(FittedModel),
}

/// Fit-once forecaster
///
/// Starts unfitted. The first [`ForecastEngine::fit`] moves it to fitted,
/// including when the optimizer did not converge, in which case the degraded
/// model is kept and the error is still returned.
#[derive(Debug)]
pub struct ForecastEngine {
    spec: ModelSpec,
    options: FitOptions,
    state: EngineState,
}

impl ForecastEngine {
    pub fn new(spec: ModelSpec, options: FitOptions) -> Self {
        Self {
            spec,
            options,
            state: EngineState::Unfitted,
        }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, EngineState::Fitted(_))
    }

    pub fn fit(&mut self, series: Series) -> Result<()> {
        if self.is_fitted() {
            return Err(Error::AlreadyFitted);
        }
        match fit(&series, &self.spec, &self.options) {
            Ok(model) => {
                self.state = EngineState::Fitted(model);
                Ok(())
            }
            Err(Error::NonConvergence(model)) => {
                warn!(
                    iterations = model.diagnostics().iterations,
                    "Keeping non-converged model"
                );
                self.state = EngineState::Fitted((*model).clone());
                Err(Error::NonConvergence(model))
            }
            Err(e) => Err(e),
        }
    }

    pub fn model(&self) -> Result<&FittedModel> {
        match &self.state {
            EngineState::Fitted(model) => Ok(model),
            EngineState::Unfitted => Err(Error::ModelNotFitted),
        }
    }

    pub fn predict_in_sample(&self) -> Result<Vec<TimePoint>> {
        Ok(self.model()?.predict_in_sample())
    }

    pub fn forecast(&self, horizon: i64) -> Result<ForecastResult> {
        self.model()?.forecast(horizon)
    }
}
