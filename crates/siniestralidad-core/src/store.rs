//! Series store: the monthly claims-ratio series and the yearly ARS tables
//!
//! Loaded once from four CSV files:
//!
//! - the general monthly table (`año`, `mes`, `siniestralidad`, and
//!   optionally `ingresos`, `gastos`)
//! - ingresos, gastos and siniestralidad by ARS type (`año`, `ars_publica`,
//!   `ars_privada`, `ars_autogestion`)
//!
//! Nothing is mutated after loading.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DataConfig;
use crate::error::{Error, Result};
use crate::series::{Series, TimePoint, YearMonth};

/// Kind of health insurer (ARS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArsType {
    #[serde(rename = "ars_publica")]
    Publica,
    #[serde(rename = "ars_privada")]
    Privada,
    #[serde(rename = "ars_autogestion")]
    Autogestion,
}

impl ArsType {
    pub fn all() -> &'static [ArsType] {
        &[Self::Publica, Self::Privada, Self::Autogestion]
    }

    /// CSV column and filter value
    pub fn column(&self) -> &'static str {
        match self {
            Self::Publica => "ars_publica",
            Self::Privada => "ars_privada",
            Self::Autogestion => "ars_autogestion",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Publica => "Pública",
            Self::Privada => "Privada",
            Self::Autogestion => "Autogestión",
        }
    }
}

impl fmt::Display for ArsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for ArsType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let name = normalized.strip_prefix("ars_").unwrap_or(&normalized);
        match name {
            "publica" | "pública" => Ok(Self::Publica),
            "privada" => Ok(Self::Privada),
            "autogestion" | "autogestión" => Ok(Self::Autogestion),
            _ => Err(format!(
                "Unknown ARS type: {} (use ars_publica, ars_privada or ars_autogestion)",
                s
            )),
        }
    }
}

/// One row of the general monthly table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecord {
    pub month: YearMonth,
    /// Claims ratio, percent
    pub siniestralidad: f64,
    pub ingresos: Option<f64>,
    pub gastos: Option<f64>,
}

/// One year of a per-ARS-type table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArsRow {
    pub year: i32,
    #[serde(rename = "ars_publica")]
    pub publica: f64,
    #[serde(rename = "ars_privada")]
    pub privada: f64,
    #[serde(rename = "ars_autogestion")]
    pub autogestion: f64,
}

impl ArsRow {
    pub fn value(&self, ars: ArsType) -> f64 {
        match ars {
            ArsType::Publica => self.publica,
            ArsType::Privada => self.privada,
            ArsType::Autogestion => self.autogestion,
        }
    }
}

/// Yearly values of one quantity by ARS type, sorted by year
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArsTable {
    rows: Vec<ArsRow>,
}

impl ArsTable {
    pub fn new(mut rows: Vec<ArsRow>) -> Self {
        rows.sort_by_key(|r| r.year);
        Self { rows }
    }

    pub fn rows(&self) -> &[ArsRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for `year` (a table may repeat a year)
    pub fn year(&self, year: i32) -> Vec<ArsRow> {
        self.rows.iter().filter(|r| r.year == year).copied().collect()
    }

    /// Distinct years, ascending
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.rows.iter().map(|r| r.year).collect();
        years.dedup();
        years
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.rows.last().map(|r| r.year)
    }

    /// Mean over the ARS columns of each column's mean for `year`
    pub fn mean_of_means(&self, year: i32) -> Option<f64> {
        let rows = self.year(year);
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;
        let column_means: Vec<f64> = ArsType::all()
            .iter()
            .map(|&ars| rows.iter().map(|r| r.value(ars)).sum::<f64>() / n)
            .collect();
        Some(column_means.iter().sum::<f64>() / column_means.len() as f64)
    }
}

/// In-memory copy of every table the dashboard reads
#[derive(Debug, Clone)]
pub struct SeriesStore {
    monthly: Vec<MonthlyRecord>,
    series: Series,
    ingresos: ArsTable,
    gastos: ArsTable,
    siniestralidad: ArsTable,
}

impl SeriesStore {
    /// Read the four CSV tables; every file is closed before returning
    pub fn load(config: &DataConfig) -> Result<Self> {
        let monthly = parse_monthly(open(&config.monthly_path())?, &config.monthly_file)?;
        let ingresos = parse_ars_table(open(&config.ingresos_path())?, &config.ingresos_file)?;
        let gastos = parse_ars_table(open(&config.gastos_path())?, &config.gastos_file)?;
        let siniestralidad = parse_ars_table(
            open(&config.siniestralidad_path())?,
            &config.siniestralidad_file,
        )?;

        let store = Self::from_parts(monthly, ingresos, gastos, siniestralidad)?;
        info!(
            dir = %config.dir.display(),
            months = store.series.len(),
            start = %store.series.start(),
            end = %store.series.end(),
            years = store.siniestralidad.years().len(),
            "Loaded series store"
        );
        Ok(store)
    }

    /// Build a store from in-memory tables
    ///
    /// Monthly records are sorted by month; duplicates or gaps fail with
    /// [`Error::InvalidSeries`].
    pub fn from_parts(
        mut monthly: Vec<MonthlyRecord>,
        ingresos: ArsTable,
        gastos: ArsTable,
        siniestralidad: ArsTable,
    ) -> Result<Self> {
        monthly.sort_by_key(|r| r.month);
        let series = Series::new(
            monthly
                .iter()
                .map(|r| TimePoint::new(r.month, r.siniestralidad))
                .collect(),
        )?;

        Ok(Self {
            monthly,
            series,
            ingresos,
            gastos,
            siniestralidad,
        })
    }

    pub fn monthly(&self) -> &[MonthlyRecord] {
        &self.monthly
    }

    /// Monthly claims ratio
    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn ingresos(&self) -> &ArsTable {
        &self.ingresos
    }

    pub fn gastos(&self) -> &ArsTable {
        &self.gastos
    }

    pub fn siniestralidad_by_ars(&self) -> &ArsTable {
        &self.siniestralidad
    }

    /// Years offered by the year filter
    pub fn years(&self) -> Vec<i32> {
        self.siniestralidad.years()
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.siniestralidad.latest_year()
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::Import(format!("{}: {}", path.display(), e)))
}

/// Header positions, matched case-insensitively with `año` aliases
struct Columns {
    source: String,
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord, source: &str) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_header(h), i))
            .collect();
        Self {
            source: source.to_string(),
            index,
        }
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index.get(name).copied().ok_or_else(|| {
            Error::Import(format!("{}: missing column '{}'", self.source, name))
        })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn cell<'r>(
        &self,
        record: &'r StringRecord,
        line: u64,
        col: usize,
        name: &str,
    ) -> Result<&'r str> {
        match record.get(col).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::Import(format!(
                "{}: row {}: column '{}': empty value",
                self.source, line, name
            ))),
        }
    }

    fn number(&self, record: &StringRecord, line: u64, col: usize, name: &str) -> Result<f64> {
        let raw = self.cell(record, line, col, name)?;
        parse_number(raw).ok_or_else(|| self.invalid(line, name, raw))
    }

    fn optional_number(
        &self,
        record: &StringRecord,
        line: u64,
        col: Option<usize>,
        name: &str,
    ) -> Result<Option<f64>> {
        let Some(col) = col else {
            return Ok(None);
        };
        match record.get(col).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_number(raw)
                .map(Some)
                .ok_or_else(|| self.invalid(line, name, raw)),
        }
    }

    fn year(&self, record: &StringRecord, line: u64, col: usize) -> Result<i32> {
        let raw = self.cell(record, line, col, "año")?;
        parse_year(raw).ok_or_else(|| self.invalid(line, "año", raw))
    }

    fn invalid(&self, line: u64, name: &str, raw: &str) -> Error {
        Error::Import(format!(
            "{}: row {}: column '{}': invalid value '{}'",
            self.source, line, name, raw
        ))
    }
}

fn normalize_header(header: &str) -> String {
    let name = header.trim().trim_start_matches('\u{feff}').trim().to_lowercase();
    match name.as_str() {
        "anio" | "ano" => "año".to_string(),
        _ => name,
    }
}

/// Accepts `12.5`, `12.5%`, `1,234.5`; a comma is only a thousands separator
fn parse_number(raw: &str) -> Option<f64> {
    let value = raw.trim().trim_end_matches('%').trim();
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if fraction.contains(',') {
        return None;
    }
    let digits = whole.trim_start_matches(['-', '+']);
    if digits.contains(',') && !is_digit_grouped(digits) {
        return None;
    }

    let cleaned: String = value.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `1,234,567`: a lead group of 1-3 digits, then groups of exactly 3
fn is_digit_grouped(digits: &str) -> bool {
    let all_digits = |group: &str| group.bytes().all(|b| b.is_ascii_digit());
    let mut groups = digits.split(',');
    let lead_ok = groups
        .next()
        .is_some_and(|lead| (1..=3).contains(&lead.len()) && all_digits(lead));
    lead_ok && groups.all(|group| group.len() == 3 && all_digits(group))
}

/// Accepts `2019`, `2019.0`, and dates starting with the year (`2019-01-01`)
fn parse_year(raw: &str) -> Option<i32> {
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    if let Ok(value) = raw.parse::<f64>() {
        if value.fract() == 0.0 && value.abs() < 10_000.0 {
            return Some(value as i32);
        }
        return None;
    }
    let (year, _) = raw.split_once('-')?;
    year.parse().ok()
}

fn line_of(record: &StringRecord, row: usize) -> u64 {
    record
        .position()
        .map(|p| p.line())
        .unwrap_or(row as u64 + 2)
}

fn reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Parse the general monthly table
pub fn parse_monthly<R: Read>(input: R, source: &str) -> Result<Vec<MonthlyRecord>> {
    let mut rdr = reader(input);
    let columns = Columns::new(rdr.headers()?, source);

    let year_col = columns.require("año")?;
    let month_col = columns.require("mes")?;
    let ratio_col = columns.require("siniestralidad")?;
    let ingresos_col = columns.optional("ingresos");
    let gastos_col = columns.optional("gastos");

    let mut records = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let line = line_of(&record, row);

        let year = columns.year(&record, line, year_col)?;
        let raw_month = columns.cell(&record, line, month_col, "mes")?;
        let month = parse_year(raw_month)
            .and_then(|m| u32::try_from(m).ok())
            .and_then(|m| YearMonth::new(year, m))
            .ok_or_else(|| columns.invalid(line, "mes", raw_month))?;

        records.push(MonthlyRecord {
            month,
            siniestralidad: columns.number(&record, line, ratio_col, "siniestralidad")?,
            ingresos: columns.optional_number(&record, line, ingresos_col, "ingresos")?,
            gastos: columns.optional_number(&record, line, gastos_col, "gastos")?,
        });
    }

    debug!(source, rows = records.len(), "Parsed monthly table");
    Ok(records)
}

/// Parse a per-ARS-type yearly table
pub fn parse_ars_table<R: Read>(input: R, source: &str) -> Result<ArsTable> {
    let mut rdr = reader(input);
    let columns = Columns::new(rdr.headers()?, source);

    let year_col = columns.require("año")?;
    let publica_col = columns.require(ArsType::Publica.column())?;
    let privada_col = columns.require(ArsType::Privada.column())?;
    let autogestion_col = columns.require(ArsType::Autogestion.column())?;

    let mut rows = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let line = line_of(&record, row);
        rows.push(ArsRow {
            year: columns.year(&record, line, year_col)?,
            publica: columns.number(&record, line, publica_col, "ars_publica")?,
            privada: columns.number(&record, line, privada_col, "ars_privada")?,
            autogestion: columns.number(&record, line, autogestion_col, "ars_autogestion")?,
        });
    }

    debug!(source, rows = rows.len(), "Parsed ARS table");
    Ok(ArsTable::new(rows))
}
