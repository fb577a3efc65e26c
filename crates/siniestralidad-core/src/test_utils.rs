//! Test utilities for siniestralidad-core
//!
//! Deterministic synthetic claims-ratio data shaped like the real tables:
//! 204 months from 2007-01 to 2023-12 and one row per year for each ARS
//! table. Noise comes from a fixed-seed LCG so every run sees the same
//! numbers.

use std::f64::consts::PI;
use std::path::Path;

use tempfile::TempDir;

use crate::config::DataConfig;
use crate::error::Result;
use crate::series::{Series, YearMonth};
use crate::store::{ArsRow, ArsTable, MonthlyRecord, SeriesStore};

pub const FIRST_YEAR: i32 = 2007;
pub const LAST_YEAR: i32 = 2023;
pub const MONTHS: usize = 204;

/// Minimal LCG (Knuth MMIX constants)
struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Roughly normal, mean 0, in [-1, 1]
    fn next_noise(&mut self) -> f64 {
        (0..4).map(|_| self.next_unit()).sum::<f64>() / 2.0 - 1.0
    }
}

/// Trend + yearly seasonality + AR(1) noise, in percent
pub fn synthetic_values(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = Lcg(seed);
    let mut noise = 0.0;
    (0..n)
        .map(|t| {
            let phase = 2.0 * PI * (t % 12) as f64 / 12.0;
            noise = 0.3 * noise + 1.5 * rng.next_noise();
            82.0 + 0.03 * t as f64 + 4.0 * phase.sin() + 1.5 * (2.0 * phase).cos() + noise
        })
        .collect()
}

pub fn synthetic_series(start: YearMonth, n: usize, seed: u64) -> Series {
    Series::from_values(start, &synthetic_values(n, seed)).expect("synthetic series is valid")
}

fn first_month() -> YearMonth {
    YearMonth::new(FIRST_YEAR, 1).expect("valid month")
}

/// 204 months, 2007-01..2023-12
pub fn claims_series() -> Series {
    synthetic_series(first_month(), MONTHS, 42)
}

pub fn monthly_records() -> Vec<MonthlyRecord> {
    claims_series()
        .points()
        .iter()
        .enumerate()
        .map(|(t, p)| {
            let ingresos = 1_000.0 + 12.0 * t as f64;
            MonthlyRecord {
                month: p.date,
                siniestralidad: p.value,
                ingresos: Some(ingresos),
                gastos: Some(ingresos * p.value / 100.0),
            }
        })
        .collect()
}

/// One row per year with distinct levels per ARS type
pub fn ars_table(base: f64, growth: f64) -> ArsTable {
    ArsTable::new(
        (FIRST_YEAR..=LAST_YEAR)
            .map(|year| {
                let i = (year - FIRST_YEAR) as f64;
                ArsRow {
                    year,
                    publica: base * 1.1 + growth * i,
                    privada: base + growth * i * 1.2,
                    autogestion: base * 0.8 + growth * i * 0.5 + (i * 0.9).sin(),
                }
            })
            .collect(),
    )
}

pub fn ingresos_table() -> ArsTable {
    ars_table(10.0, 1.5)
}

pub fn gastos_table() -> ArsTable {
    ars_table(8.5, 1.3)
}

pub fn siniestralidad_table() -> ArsTable {
    ars_table(80.0, 0.4)
}

pub fn sample_store() -> SeriesStore {
    SeriesStore::from_parts(
        monthly_records(),
        ingresos_table(),
        gastos_table(),
        siniestralidad_table(),
    )
    .expect("sample store is valid")
}

/// Write the four CSV tables (default file names) into `dir`
pub fn write_tables(dir: &Path) -> Result<DataConfig> {
    let config = DataConfig::in_dir(dir);

    let mut writer = csv::Writer::from_path(config.monthly_path())?;
    writer.write_record(["año", "mes", "siniestralidad", "ingresos", "gastos"])?;
    for record in monthly_records() {
        writer.write_record([
            record.month.year().to_string(),
            record.month.month().to_string(),
            format!("{:.6}", record.siniestralidad),
            format!("{:.2}", record.ingresos.unwrap_or_default()),
            format!("{:.2}", record.gastos.unwrap_or_default()),
        ])?;
    }
    writer.flush()?;

    for (path, table) in [
        (config.ingresos_path(), ingresos_table()),
        (config.gastos_path(), gastos_table()),
        (config.siniestralidad_path(), siniestralidad_table()),
    ] {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["año", "ars_publica", "ars_privada", "ars_autogestion"])?;
        for row in table.rows() {
            writer.write_record([
                row.year.to_string(),
                format!("{:.6}", row.publica),
                format!("{:.6}", row.privada),
                format!("{:.6}", row.autogestion),
            ])?;
        }
        writer.flush()?;
    }

    Ok(config)
}

/// Temp directory holding the four CSV tables
pub fn write_fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    write_tables(dir.path()).expect("write CSV fixture");
    dir
}
