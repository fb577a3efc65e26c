//! Seasonal ARIMA structure
//!
//! The model is written in lag-polynomial form:
//!
//! ```text
//! φ(B) Φ(B^s) (1 − B)^d (1 − B^s)^D y_t = θ(B) Θ(B^s) e_t
//! ```
//!
//! with `φ(B) = 1 − φ₁B − …`, `Θ(B^s) = 1 + Θ₁B^s + …` (statsmodels signs).
//! Polynomials are plain coefficient vectors, index = lag, leading 1.
//!
//! This module holds the pure building blocks: the model spec, polynomial
//! expansion, differencing/integration, the conditional residual recursion
//! and the stationarity transform used by the optimizer. Fitting and
//! forecasting live in [`crate::forecast`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Model orders (p, d, q) × (P, D, Q, s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    /// Seasonal AR order (P)
    pub seasonal_p: usize,
    /// Seasonal differencing order (D)
    pub seasonal_d: usize,
    /// Seasonal MA order (Q)
    pub seasonal_q: usize,
    /// Seasonal period (s)
    pub period: usize,
}

impl ModelSpec {
    pub fn new(
        order: (usize, usize, usize),
        seasonal_order: (usize, usize, usize, usize),
    ) -> Self {
        let (p, d, q) = order;
        let (seasonal_p, seasonal_d, seasonal_q, period) = seasonal_order;
        Self {
            p,
            d,
            q,
            seasonal_p,
            seasonal_d,
            seasonal_q,
            period,
        }
    }

    /// SARIMA(1,1,1)(1,1,1,12), the structure the dashboard forecasts with
    pub fn claims_ratio() -> Self {
        Self::new((1, 1, 1), (1, 1, 1, 12))
    }

    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    pub fn seasonal_order(&self) -> (usize, usize, usize, usize) {
        (self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period)
    }

    fn has_seasonal_terms(&self) -> bool {
        self.seasonal_p + self.seasonal_d + self.seasonal_q > 0
    }

    /// Check the orders describe a model we can estimate
    pub fn validate(&self) -> Result<()> {
        if self.has_seasonal_terms() && self.period < 2 {
            return Err(Error::InvalidSpec(format!(
                "seasonal period must be at least 2 when seasonal orders are set (got {})",
                self.period
            )));
        }
        if self.d > 2 || self.seasonal_d > 2 {
            return Err(Error::InvalidSpec(
                "differencing orders above 2 are not supported".into(),
            ));
        }
        Ok(())
    }

    /// Number of estimated ARMA coefficients
    pub fn n_coefficients(&self) -> usize {
        self.p + self.q + self.seasonal_p + self.seasonal_q
    }

    fn order_sum(&self) -> usize {
        self.p + self.d + self.q + self.seasonal_p + self.seasonal_d + self.seasonal_q
    }

    fn effective_period(&self) -> usize {
        if self.has_seasonal_terms() {
            self.period
        } else {
            0
        }
    }

    /// Degree of the differencing polynomial: d + D·s
    pub fn differencing_degree(&self) -> usize {
        self.d + self.seasonal_d * self.effective_period()
    }

    /// Degree of the expanded AR polynomial: p + P·s
    pub fn ar_degree(&self) -> usize {
        self.p + self.seasonal_p * self.effective_period()
    }

    /// Degree of the expanded MA polynomial: q + Q·s
    pub fn ma_degree(&self) -> usize {
        self.q + self.seasonal_q * self.effective_period()
    }

    /// Shortest series `fit` accepts
    ///
    /// Twice the seasonal period plus the sum of all orders (30 for the
    /// claims-ratio spec), and never less than one conditional residual
    /// after differencing.
    pub fn min_observations(&self) -> usize {
        let by_period = 2 * self.effective_period() + self.order_sum();
        let by_structure = self.differencing_degree() + self.ar_degree() + 1;
        by_period.max(by_structure)
    }

    /// (1 − B)^d (1 − B^s)^D
    pub fn differencing_polynomial(&self) -> Vec<f64> {
        let regular = power(&[1.0, -1.0], self.d);
        let seasonal = if self.seasonal_d > 0 {
            let mut base = vec![0.0; self.period + 1];
            base[0] = 1.0;
            base[self.period] = -1.0;
            power(&base, self.seasonal_d)
        } else {
            vec![1.0]
        };
        multiply(&regular, &seasonal)
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::claims_ratio()
    }
}

impl std::fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SARIMA({},{},{})({},{},{},{})",
            self.p, self.d, self.q, self.seasonal_p, self.seasonal_d, self.seasonal_q, self.period
        )
    }
}

/// Estimated ARMA coefficients, statsmodels sign conventions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
}

impl Coefficients {
    pub fn zeros(spec: &ModelSpec) -> Self {
        Self {
            ar: vec![0.0; spec.p],
            ma: vec![0.0; spec.q],
            seasonal_ar: vec![0.0; spec.seasonal_p],
            seasonal_ma: vec![0.0; spec.seasonal_q],
        }
    }

    /// Map an unconstrained optimizer vector `[ar, ma, sar, sma]` to
    /// stationary AR and invertible MA coefficients
    pub fn from_unconstrained(spec: &ModelSpec, params: &[f64]) -> Self {
        let (ar, rest) = params.split_at(spec.p);
        let (ma, rest) = rest.split_at(spec.q);
        let (seasonal_ar, seasonal_ma) = rest.split_at(spec.seasonal_p);
        Self {
            ar: constrain_stationary(ar),
            ma: negate(&constrain_stationary(ma)),
            seasonal_ar: constrain_stationary(seasonal_ar),
            seasonal_ma: negate(&constrain_stationary(&seasonal_ma[..spec.seasonal_q])),
        }
    }

    /// Inverse of [`Coefficients::from_unconstrained`]
    pub fn to_unconstrained(&self) -> Vec<f64> {
        let mut params = unconstrain_stationary(&self.ar);
        params.extend(unconstrain_stationary(&negate(&self.ma)));
        params.extend(unconstrain_stationary(&self.seasonal_ar));
        params.extend(unconstrain_stationary(&negate(&self.seasonal_ma)));
        params
    }

    /// Expand into the full AR and MA lag polynomials for period `s`
    pub fn expand(&self, period: usize) -> ArmaPolynomials {
        let ar = multiply(
            &ar_polynomial(&self.ar, 1),
            &ar_polynomial(&self.seasonal_ar, period),
        );
        let ma = multiply(
            &ma_polynomial(&self.ma, 1),
            &ma_polynomial(&self.seasonal_ma, period),
        );
        ArmaPolynomials { ar, ma }
    }
}

/// Expanded φ(B)Φ(B^s) and θ(B)Θ(B^s), leading coefficient 1
#[derive(Debug, Clone, PartialEq)]
pub struct ArmaPolynomials {
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
}

impl ArmaPolynomials {
    /// One-step-ahead predictions and residuals of the differenced series
    ///
    /// Pre-sample values and shocks are zero, so the recursion starts at the
    /// first observation and is exact from index `ar.len() - 1` onwards.
    pub fn one_step(&self, w: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = w.len();
        let mut predictions = Vec::with_capacity(n);
        let mut residuals = Vec::with_capacity(n);

        for t in 0..n {
            let pred = self.predict_next(&w[..t], &residuals);
            predictions.push(pred);
            residuals.push(w[t] - pred);
        }

        (predictions, residuals)
    }

    /// Prediction of the next differenced value given its past and past shocks
    ///
    /// Lags reaching before the start of `w` contribute zero.
    pub fn predict_next(&self, w: &[f64], shocks: &[f64]) -> f64 {
        let t = w.len();
        let mut pred = 0.0;
        for (k, coeff) in self.ar.iter().enumerate().skip(1) {
            if k > t {
                break;
            }
            pred -= coeff * w[t - k];
        }
        for (k, coeff) in self.ma.iter().enumerate().skip(1) {
            if k > shocks.len() {
                break;
            }
            pred += coeff * shocks[shocks.len() - k];
        }
        pred
    }

    /// Conditional sum of squared residuals from index `start`
    pub fn css(&self, w: &[f64], start: usize) -> f64 {
        let (_, residuals) = self.one_step(w);
        residuals.iter().skip(start).map(|e| e * e).sum()
    }

    /// First `n` MA(∞) weights of θ(B)Θ(B^s) / (φ(B)Φ(B^s)Δ(B))
    pub fn psi_weights(&self, differencing: &[f64], n: usize) -> Vec<f64> {
        self.psi_iter(differencing).take(n).collect()
    }

    /// The MA(∞) weights as an unbounded sequence
    pub fn psi_iter(&self, differencing: &[f64]) -> PsiWeights {
        let denominator = multiply(&self.ar, differencing);
        PsiWeights {
            ma: self.ma.clone(),
            recent: VecDeque::with_capacity(denominator.len()),
            denominator,
            index: 0,
        }
    }
}

/// Iterator over ψ weights; keeps only the lags the recursion needs
#[derive(Debug, Clone)]
pub struct PsiWeights {
    ma: Vec<f64>,
    denominator: Vec<f64>,
    /// Most recent weight first
    recent: VecDeque<f64>,
    index: usize,
}

impl Iterator for PsiWeights {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let mut value = self.ma.get(self.index).copied().unwrap_or(0.0);
        for (coeff, psi) in self.denominator.iter().skip(1).zip(&self.recent) {
            value -= coeff * psi;
        }

        self.recent.push_front(value);
        self.recent.truncate(self.denominator.len().saturating_sub(1));
        self.index = self.index.saturating_add(1);
        Some(value)
    }
}

/// Polynomial product
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

fn power(base: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![1.0];
    for _ in 0..n {
        out = multiply(&out, base);
    }
    out
}

/// 1 − c₁B^step − c₂B^(2·step) − …
fn ar_polynomial(coeffs: &[f64], step: usize) -> Vec<f64> {
    lag_polynomial(coeffs, step, -1.0)
}

/// 1 + c₁B^step + c₂B^(2·step) + …
fn ma_polynomial(coeffs: &[f64], step: usize) -> Vec<f64> {
    lag_polynomial(coeffs, step, 1.0)
}

fn lag_polynomial(coeffs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coeffs.len() * step + 1];
    poly[0] = 1.0;
    for (i, c) in coeffs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

fn negate(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| -v).collect()
}

/// Apply Δ(B) to `y`; the result is `deg Δ` shorter
pub fn difference(y: &[f64], delta: &[f64]) -> Vec<f64> {
    let degree = delta.len() - 1;
    if y.len() <= degree {
        return Vec::new();
    }
    (degree..y.len())
        .map(|t| delta.iter().enumerate().map(|(k, c)| c * y[t - k]).sum())
        .collect()
}

/// Undo Δ(B) for one new observation: `y_t = w_t − Σ_{k≥1} δ_k y_{t−k}`
///
/// `history` must end at `t − 1` and hold at least `deg Δ` values.
pub fn integrate_step(w: f64, history: &[f64], delta: &[f64]) -> f64 {
    let n = history.len();
    w - delta
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| c * history[n - k])
        .sum::<f64>()
}

/// Unconstrained reals → coefficients of a stationary `1 − Σ φ_i z^i`
///
/// Each value is squashed to a partial autocorrelation in (−1, 1) and the
/// Durbin–Levinson recursion builds the AR coefficients from them.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let pacf: Vec<f64> = unconstrained
        .iter()
        .map(|u| u / (1.0 + u * u).sqrt())
        .collect();

    let mut phi: Vec<f64> = Vec::with_capacity(pacf.len());
    for (k, &r) in pacf.iter().enumerate() {
        let mut next = phi.clone();
        for j in 0..k {
            next[j] = phi[j] - r * phi[k - 1 - j];
        }
        next.push(r);
        phi = next;
    }
    phi
}

/// Inverse of [`constrain_stationary`]
///
/// Partial autocorrelations are clipped to ±0.99 so near-unit-root inputs
/// map to large but finite values.
pub fn unconstrain_stationary(constrained: &[f64]) -> Vec<f64> {
    let p = constrained.len();
    let mut phi = constrained.to_vec();
    let mut pacf = vec![0.0; p];

    for k in (0..p).rev() {
        let r = phi[k].clamp(-0.99, 0.99);
        pacf[k] = r;
        let denom = 1.0 - r * r;
        let mut prev = vec![0.0; k];
        for j in 0..k {
            prev[j] = (phi[j] + r * phi[k - 1 - j]) / denom;
        }
        phi = prev;
    }

    pacf.iter().map(|r| r / (1.0 - r * r).sqrt()).collect()
}

/// Sample autocorrelation of `values` at `lag`
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag >= n || n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if variance <= f64::EPSILON {
        return 0.0;
    }
    let covariance: f64 = (lag..n)
        .map(|t| (values[t] - mean) * (values[t - lag] - mean))
        .sum();
    covariance / variance
}

/// Starting point for the optimizer, in unconstrained space
///
/// The leading AR terms start at the lag-1 and lag-s autocorrelations of the
/// differenced series (pulled into ±0.9); everything else starts at zero.
pub fn start_params(spec: &ModelSpec, w: &[f64]) -> Vec<f64> {
    let mut coeffs = Coefficients::zeros(spec);
    if let Some(first) = coeffs.ar.first_mut() {
        *first = autocorrelation(w, 1).clamp(-0.9, 0.9);
    }
    if let Some(first) = coeffs.seasonal_ar.first_mut() {
        *first = autocorrelation(w, spec.period).clamp(-0.9, 0.9);
    }
    coeffs.to_unconstrained()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-10, "{} != {}", a, b);
    }

    #[test]
    fn test_claims_ratio_spec() {
        let spec = ModelSpec::claims_ratio();
        assert_eq!(spec.order(), (1, 1, 1));
        assert_eq!(spec.seasonal_order(), (1, 1, 1, 12));
        assert_eq!(spec.n_coefficients(), 4);
        assert_eq!(spec.differencing_degree(), 13);
        assert_eq!(spec.ar_degree(), 13);
        assert_eq!(spec.ma_degree(), 13);
        assert_eq!(spec.min_observations(), 30);
        assert_eq!(spec.to_string(), "SARIMA(1,1,1)(1,1,1,12)");
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_spec_validation() {
        let bad = ModelSpec::new((1, 0, 0), (1, 0, 0, 0));
        assert!(matches!(bad.validate(), Err(Error::InvalidSpec(_))));

        let non_seasonal = ModelSpec::new((1, 1, 0), (0, 0, 0, 0));
        assert!(non_seasonal.validate().is_ok());
        assert_eq!(non_seasonal.differencing_degree(), 1);
        assert_eq!(non_seasonal.min_observations(), 3);
    }

    #[test]
    fn test_differencing_polynomial() {
        let delta = ModelSpec::claims_ratio().differencing_polynomial();
        assert_eq!(delta.len(), 14);
        assert_close(delta[0], 1.0);
        assert_close(delta[1], -1.0);
        assert_close(delta[12], -1.0);
        assert_close(delta[13], 1.0);
        let middle: f64 = delta[2..12].iter().map(|c| c.abs()).sum();
        assert_close(middle, 0.0);
    }

    #[test]
    fn test_expand_multiplicative_polynomials() {
        let coeffs = Coefficients {
            ar: vec![0.5],
            ma: vec![0.3],
            seasonal_ar: vec![0.2],
            seasonal_ma: vec![-0.4],
        };
        let polys = coeffs.expand(12);

        // (1 − 0.5B)(1 − 0.2B^12) = 1 − 0.5B − 0.2B^12 + 0.1B^13
        assert_eq!(polys.ar.len(), 14);
        assert_close(polys.ar[1], -0.5);
        assert_close(polys.ar[12], -0.2);
        assert_close(polys.ar[13], 0.1);

        // (1 + 0.3B)(1 − 0.4B^12) = 1 + 0.3B − 0.4B^12 − 0.12B^13
        assert_close(polys.ma[1], 0.3);
        assert_close(polys.ma[12], -0.4);
        assert_close(polys.ma[13], -0.12);
    }

    #[test]
    fn test_difference_and_integrate_step() {
        let delta = ModelSpec::new((0, 1, 0), (0, 0, 0, 0)).differencing_polynomial();
        let y = [1.0, 3.0, 6.0, 10.0];
        let w = difference(&y, &delta);
        assert_eq!(w, vec![2.0, 3.0, 4.0]);
        assert_close(integrate_step(5.0, &y, &delta), 15.0);
    }

    #[test]
    fn test_seasonal_difference() {
        let delta = ModelSpec::claims_ratio().differencing_polynomial();
        // A pure seasonal pattern plus a linear trend vanishes after (1−B)(1−B^12)
        let pattern = [5.0, 1.0, 7.0, 3.0, 2.0, 8.0, 4.0, 6.0, 0.0, 9.0, 2.5, 1.5];
        let y: Vec<f64> = (0..40).map(|t| 2.0 * t as f64 + pattern[t % 12]).collect();
        let w = difference(&y, &delta);
        assert_eq!(w.len(), 27);
        assert!(w.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_constrain_stationary_bounds() {
        for u in [-100.0, -1.0, 0.0, 0.5, 100.0] {
            let phi = constrain_stationary(&[u]);
            assert!(phi[0].abs() < 1.0);
        }
        assert_close(constrain_stationary(&[0.0])[0], 0.0);
    }

    #[test]
    fn test_unconstrain_inverts_constrain() {
        let u = [0.7, -0.3];
        let phi = constrain_stationary(&u);
        let back = unconstrain_stationary(&phi);
        assert_close(back[0], u[0]);
        assert_close(back[1], u[1]);
    }

    #[test]
    fn test_coefficients_from_unconstrained_negates_ma() {
        let spec = ModelSpec::claims_ratio();
        let coeffs = Coefficients::from_unconstrained(&spec, &[1.0, 1.0, 1.0, 1.0]);
        let r = 1.0 / 2.0_f64.sqrt();
        assert_close(coeffs.ar[0], r);
        assert_close(coeffs.ma[0], -r);
        assert_close(coeffs.seasonal_ar[0], r);
        assert_close(coeffs.seasonal_ma[0], -r);

        let back = coeffs.to_unconstrained();
        for value in back {
            assert_close(value, 1.0);
        }
    }

    #[test]
    fn test_one_step_recovers_ar1_shocks() {
        // w_t = 0.5 w_{t−1} + e_t with known shocks
        let shocks = [1.0, 0.0, -1.0, 2.0, 0.5];
        let mut w = Vec::new();
        let mut prev = 0.0;
        for e in shocks {
            let value = 0.5 * prev + e;
            w.push(value);
            prev = value;
        }
        let polys = ArmaPolynomials {
            ar: vec![1.0, -0.5],
            ma: vec![1.0],
        };
        let (_, residuals) = polys.one_step(&w);
        for (r, e) in residuals.iter().zip(shocks) {
            assert_close(*r, e);
        }
        assert_close(polys.css(&w, 1), 0.0 + 1.0 + 4.0 + 0.25);
    }

    #[test]
    fn test_psi_weights_random_walk() {
        // (1 − B) y = e  ⇒  ψ_j = 1 for all j
        let polys = ArmaPolynomials {
            ar: vec![1.0],
            ma: vec![1.0],
        };
        let psi = polys.psi_weights(&[1.0, -1.0], 5);
        assert_eq!(psi, vec![1.0; 5]);
    }

    #[test]
    fn test_psi_iter_matches_full_recursion() {
        let spec = ModelSpec::claims_ratio();
        let coefficients = Coefficients {
            ar: vec![0.4],
            ma: vec![-0.3],
            seasonal_ar: vec![0.2],
            seasonal_ma: vec![-0.5],
        };
        let polys = coefficients.expand(spec.period);
        let delta = spec.differencing_polynomial();
        let denominator = multiply(&polys.ar, &delta);

        let mut expected: Vec<f64> = Vec::new();
        for j in 0..80 {
            let mut value = polys.ma.get(j).copied().unwrap_or(0.0);
            for k in 1..=j.min(denominator.len() - 1) {
                value -= denominator[k] * expected[j - k];
            }
            expected.push(value);
        }

        let psi: Vec<f64> = polys.psi_iter(&delta).take(80).collect();
        for (a, b) in psi.iter().zip(&expected) {
            assert_close(*a, *b);
        }
    }

    #[test]
    fn test_autocorrelation() {
        let alternating: Vec<f64> = (0..20).map(|t| if t % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(autocorrelation(&alternating, 1) < -0.9);
        assert_eq!(autocorrelation(&[3.0; 10], 1), 0.0);
    }

    #[test]
    fn test_start_params_length() {
        let spec = ModelSpec::claims_ratio();
        let w: Vec<f64> = (0..40).map(|t| (t as f64 * 0.7).sin()).collect();
        let start = start_params(&spec, &w);
        assert_eq!(start.len(), 4);
        assert!(start.iter().all(|v| v.is_finite()));
        // MA terms start at zero
        assert_close(start[1], 0.0);
        assert_close(start[3], 0.0);
    }
}
