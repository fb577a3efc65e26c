//! Model command implementations (fit, forecast)

use anyhow::{Context, Result};
use siniestralidad_core::AppState;

pub fn cmd_fit(state: &AppState) -> Result<()> {
    let model = state.model()?;
    let spec = model.spec();
    let series = model.series();
    let coefficients = model.coefficients();
    let diagnostics = model.diagnostics();

    println!();
    println!("📈 {}", spec);
    println!(
        "   Series: {} to {} ({} months)",
        series.start(),
        series.end(),
        series.len()
    );
    println!("   ─────────────────────────────────────────────────────────────");
    for (name, values) in [
        ("ar", &coefficients.ar),
        ("ma", &coefficients.ma),
        ("seasonal ar", &coefficients.seasonal_ar),
        ("seasonal ma", &coefficients.seasonal_ma),
    ] {
        for (i, value) in values.iter().enumerate() {
            println!("   {:<14} L{:<3} {:>10.4}", name, i + 1, value);
        }
    }
    println!("   {:<19} {:>10.4}", "sigma2", model.sigma2());
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Log-likelihood: {:.3}", diagnostics.log_likelihood);
    println!("   AIC: {:.3}   BIC: {:.3}", diagnostics.aic, diagnostics.bic);
    println!(
        "   Iterations: {}   Residuals used: {}",
        diagnostics.iterations, diagnostics.n_obs
    );

    let status = state.status();
    if status.converged && !status.fallback {
        println!("   ✅ Converged");
    }
    if let Some(warning) = &status.warning {
        println!("   ⚠️  {}", warning);
    }
    println!();

    Ok(())
}

pub fn cmd_forecast(state: &AppState, horizon: i64, json: bool) -> Result<()> {
    let horizon = state.config().forecast.cap_horizon(horizon);
    let forecast = state
        .engine()
        .forecast(horizon)
        .context("Failed to compute forecast")?;

    if json {
        let output = serde_json::json!({
            "horizon": horizon,
            "forecast": forecast,
            "status": state.status(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("🔮 Forecast: {} months", horizon);
    if let Some(warning) = &state.status().warning {
        println!("   ⚠️  {}", warning);
    }
    println!("   ─────────────────────────────────────────────────────────────");

    if forecast.is_empty() {
        println!("   (no months requested)");
    } else {
        println!(
            "   {:<8} {:>12} {:>12} {:>12}",
            "Month", "Forecast", "Lower 95%", "Upper 95%"
        );
        for point in &forecast.points {
            println!(
                "   {:<8} {:>12.2} {:>12.2} {:>12.2}",
                point.date.to_string(),
                point.value,
                point.lower,
                point.upper
            );
        }
    }
    println!();

    Ok(())
}
