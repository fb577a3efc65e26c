//! Dashboard view commands (history, ars, amounts, summary)

use anyhow::Result;
use siniestralidad_core::dashboard::{
    amounts_by_ars, in_sample_chart, siniestralidad_by_ars, siniestralidad_line, trend_summary,
    BarChart,
};
use siniestralidad_core::{AppState, ArsFilter, YearFilter};

use super::format_optional;

pub fn cmd_history(state: &AppState, year: YearFilter, fitted: bool) -> Result<()> {
    let chart = siniestralidad_line(state.store(), year);
    let observed = &chart.traces[0].points;

    // In-sample values are computed over the full series; align by month
    let fitted_values = if fitted {
        Some(in_sample_chart(state.engine())?.traces[1].points.clone())
    } else {
        None
    };

    println!();
    println!("📉 {} ({})", chart.title, year);
    println!("   ─────────────────────────────────────────────────────────────");
    if observed.is_empty() {
        println!("   No months for {}", year);
        println!();
        return Ok(());
    }

    if fitted_values.is_some() {
        println!("   {:<8} {:>10} {:>10}", "Month", "Observed", "Fitted");
    } else {
        println!("   {:<8} {:>10}", "Month", "Observed");
    }
    for point in observed {
        match &fitted_values {
            Some(values) => {
                let fitted = values.iter().find(|p| p.date == point.date).map(|p| p.value);
                println!(
                    "   {:<8} {:>10.2} {:>10}",
                    point.date.to_string(),
                    point.value,
                    format_optional(fitted, 2)
                );
            }
            None => println!("   {:<8} {:>10.2}", point.date.to_string(), point.value),
        }
    }
    println!();

    Ok(())
}

fn print_bar_chart(chart: &BarChart) {
    println!();
    println!("📊 {}", chart.title);
    println!("   {}", chart.y_label);
    println!("   ─────────────────────────────────────────────────────────────");
    if chart.years.is_empty() {
        println!("   No data for the selected year");
        return;
    }

    let mut header = format!("   {:<6}", "Año");
    for series in &chart.series {
        header.push_str(&format!(" {:>12}", series.label));
    }
    println!("{}", header);

    for (i, year) in chart.years.iter().enumerate() {
        let mut line = format!("   {:<6}", year);
        for series in &chart.series {
            line.push_str(&format!(" {:>12.2}", series.values[i]));
        }
        println!("{}", line);
    }
}

pub fn cmd_ars(state: &AppState, year: YearFilter, ars: ArsFilter) -> Result<()> {
    print_bar_chart(&siniestralidad_by_ars(state.store(), year, ars));
    println!();
    Ok(())
}

pub fn cmd_amounts(state: &AppState, year: YearFilter, ars: ArsFilter) -> Result<()> {
    let charts = amounts_by_ars(state.store(), year, ars);
    print_bar_chart(&charts.gastos);
    print_bar_chart(&charts.ingresos);
    println!();
    Ok(())
}

pub fn cmd_summary(state: &AppState, year: YearFilter) -> Result<()> {
    let summary = trend_summary(state.store(), year)?;

    println!();
    println!("📋 Promedios {}", summary.year);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Gasto promedio:          {:>12.2}", summary.gasto_promedio);
    println!("   Ingreso promedio:        {:>12.2}", summary.ingreso_promedio);
    println!(
        "   Siniestralidad promedio: {:>12.2}",
        summary.siniestralidad_promedio
    );
    println!();

    Ok(())
}
