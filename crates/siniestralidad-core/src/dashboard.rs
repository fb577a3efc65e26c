//! Dashboard views
//!
//! Pure functions from filter values and loaded state to chart data. Each
//! one backs a single chart or table of the dashboard; the CLI and the HTTP
//! API only format what they return.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::ForecastConfig;
use crate::error::{Error, Result};
use crate::forecast::{ForecastEngine, ForecastPoint};
use crate::series::TimePoint;
use crate::state::ModelStatus;
use crate::store::{ArsRow, ArsTable, ArsType, SeriesStore};

const RATIO_LABEL: &str = "Siniestralidad (%)";
const AMOUNT_LABEL: &str = "Monto (Billones RD$)";

/// Year dropdown value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl YearFilter {
    /// `None` means no filter
    pub fn parse_optional(value: Option<&str>) -> Result<Self> {
        value.map_or(Ok(Self::All), str::parse)
    }

    fn matches(&self, year: i32) -> bool {
        match self {
            Self::All => true,
            Self::Year(y) => *y == year,
        }
    }
}

impl FromStr for YearFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<i32>()
            .map(Self::Year)
            .map_err(|_| Error::InvalidFilter(format!("year must be 'all' or a year, got '{}'", s)))
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Year(y) => write!(f, "{}", y),
        }
    }
}

/// ARS-type dropdown value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArsFilter {
    #[default]
    All,
    Only(ArsType),
}

impl ArsFilter {
    pub fn parse_optional(value: Option<&str>) -> Result<Self> {
        value.map_or(Ok(Self::All), str::parse)
    }

    fn types(&self) -> Vec<ArsType> {
        match self {
            Self::All => ArsType::all().to_vec(),
            Self::Only(ars) => vec![*ars],
        }
    }
}

impl FromStr for ArsFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<ArsType>()
            .map(Self::Only)
            .map_err(Error::InvalidFilter)
    }
}

impl fmt::Display for ArsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(ars) => write!(f, "{}", ars.column()),
        }
    }
}

/// Dropdown entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
}

impl FilterOption {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineTrace {
    pub name: String,
    pub points: Vec<TimePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    pub title: String,
    pub y_label: String,
    pub traces: Vec<LineTrace>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarMode {
    Group,
    Stack,
}

/// Bars for one ARS type, aligned with [`BarChart::years`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub ars: ArsType,
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub y_label: String,
    pub mode: BarMode,
    pub years: Vec<i32>,
    pub series: Vec<BarSeries>,
}

/// Yearly averages table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub year: i32,
    pub gasto_promedio: f64,
    pub ingreso_promedio: f64,
    pub siniestralidad_promedio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountCharts {
    pub gastos: BarChart,
    pub ingresos: BarChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastChart {
    pub title: String,
    pub y_label: String,
    /// Horizon after clamping
    pub horizon: i64,
    pub history: LineTrace,
    pub forecast: ForecastTrace,
    pub status: ModelStatus,
}

/// Forecast overlay with its 95% band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastTrace {
    pub name: String,
    pub points: Vec<ForecastPoint>,
}

pub fn year_options(store: &SeriesStore) -> Vec<FilterOption> {
    std::iter::once(FilterOption::new("All", "all"))
        .chain(
            store
                .years()
                .into_iter()
                .map(|y| FilterOption::new(y.to_string(), y.to_string())),
        )
        .collect()
}

pub fn ars_options() -> Vec<FilterOption> {
    std::iter::once(FilterOption::new("All", "all"))
        .chain(
            ArsType::all()
                .iter()
                .map(|ars| FilterOption::new(ars.label(), ars.column())),
        )
        .collect()
}

/// Monthly claims ratio, optionally limited to one year
pub fn siniestralidad_line(store: &SeriesStore, year: YearFilter) -> LineChart {
    let points = store
        .series()
        .points()
        .iter()
        .filter(|p| year.matches(p.date.year()))
        .copied()
        .collect();

    LineChart {
        title: "Serie de Tiempo de Siniestralidad".to_string(),
        y_label: RATIO_LABEL.to_string(),
        traces: vec![LineTrace {
            name: "siniestralidad".to_string(),
            points,
        }],
    }
}

fn bar_chart(
    table: &ArsTable,
    year: YearFilter,
    ars: ArsFilter,
    quantity: &str,
    grouped_title: &str,
    y_label: &str,
    mode: BarMode,
) -> BarChart {
    let rows: Vec<ArsRow> = table
        .rows()
        .iter()
        .filter(|r| year.matches(r.year))
        .copied()
        .collect();

    let title = match ars {
        ArsFilter::All => grouped_title.to_string(),
        ArsFilter::Only(ars) => format!("{} {}", quantity, ars.column()),
    };

    BarChart {
        title,
        y_label: y_label.to_string(),
        mode,
        years: rows.iter().map(|r| r.year).collect(),
        series: ars
            .types()
            .into_iter()
            .map(|ars| BarSeries {
                ars,
                label: ars.label().to_string(),
                values: rows.iter().map(|r| r.value(ars)).collect(),
            })
            .collect(),
    }
}

/// Claims ratio by ARS type, grouped bars per year
pub fn siniestralidad_by_ars(store: &SeriesStore, year: YearFilter, ars: ArsFilter) -> BarChart {
    bar_chart(
        store.siniestralidad_by_ars(),
        year,
        ars,
        "Siniestralidad",
        "Siniestralidad por Tipo de ARS",
        RATIO_LABEL,
        BarMode::Group,
    )
}

/// Spending and income by ARS type, stacked
pub fn amounts_by_ars(store: &SeriesStore, year: YearFilter, ars: ArsFilter) -> AmountCharts {
    AmountCharts {
        gastos: bar_chart(
            store.gastos(),
            year,
            ars,
            "Gastos",
            "Gastos por ARS",
            AMOUNT_LABEL,
            BarMode::Stack,
        ),
        ingresos: bar_chart(
            store.ingresos(),
            year,
            ars,
            "Ingresos",
            "Ingresos por ARS",
            AMOUNT_LABEL,
            BarMode::Stack,
        ),
    }
}

/// Averages for one year; `All` means the latest year with claims-ratio data
pub fn trend_summary(store: &SeriesStore, year: YearFilter) -> Result<TrendSummary> {
    let year = match year {
        YearFilter::Year(y) => y,
        YearFilter::All => store
            .latest_year()
            .ok_or_else(|| Error::NotFound("no yearly ARS data loaded".into()))?,
    };

    let mean = |table: &ArsTable, name: &str| {
        table
            .mean_of_means(year)
            .ok_or_else(|| Error::NotFound(format!("no {} data for year {}", name, year)))
    };

    Ok(TrendSummary {
        year,
        gasto_promedio: mean(store.gastos(), "gastos")?,
        ingreso_promedio: mean(store.ingresos(), "ingresos")?,
        siniestralidad_promedio: mean(store.siniestralidad_by_ars(), "siniestralidad")?,
    })
}

/// History plus a fresh forecast, horizon clamped to `[0, max_horizon]`
pub fn forecast_chart(
    engine: &ForecastEngine,
    store: &SeriesStore,
    horizon: i64,
    settings: &ForecastConfig,
) -> Result<ForecastChart> {
    let horizon = settings.clamp_horizon(horizon);
    let forecast = engine.forecast(horizon)?;
    let status = ModelStatus::from_model(engine.model()?);

    Ok(ForecastChart {
        title: "Predicción de Siniestralidad Mensual".to_string(),
        y_label: RATIO_LABEL.to_string(),
        horizon,
        history: LineTrace {
            name: "siniestralidad".to_string(),
            points: store.series().points().to_vec(),
        },
        forecast: ForecastTrace {
            name: "Predicciones".to_string(),
            points: forecast.points,
        },
        status,
    })
}

/// Observed series with the model's in-sample fit
pub fn in_sample_chart(engine: &ForecastEngine) -> Result<LineChart> {
    let model = engine.model()?;
    Ok(LineChart {
        title: "Siniestralidad observada y ajustada".to_string(),
        y_label: RATIO_LABEL.to_string(),
        traces: vec![
            LineTrace {
                name: "siniestralidad".to_string(),
                points: model.series().points().to_vec(),
            },
            LineTrace {
                name: "ajustado".to_string(),
                points: model.predict_in_sample(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::FitOptions;
    use crate::sarima::ModelSpec;
    use crate::test_utils::sample_store;

    fn engine_for(store: &SeriesStore) -> ForecastEngine {
        let mut engine = ForecastEngine::new(ModelSpec::claims_ratio(), FitOptions::default());
        match engine.fit(store.series().clone()) {
            Ok(()) | Err(Error::NonConvergence(_)) => engine,
            Err(e) => panic!("fit failed: {}", e),
        }
    }

    #[test]
    fn test_year_filter_parsing() {
        assert_eq!("all".parse::<YearFilter>().unwrap(), YearFilter::All);
        assert_eq!("ALL".parse::<YearFilter>().unwrap(), YearFilter::All);
        assert_eq!("2019".parse::<YearFilter>().unwrap(), YearFilter::Year(2019));
        assert!(matches!(
            "last".parse::<YearFilter>(),
            Err(Error::InvalidFilter(_))
        ));
        assert_eq!(YearFilter::parse_optional(None).unwrap(), YearFilter::All);
    }

    #[test]
    fn test_ars_filter_parsing() {
        assert_eq!("all".parse::<ArsFilter>().unwrap(), ArsFilter::All);
        assert_eq!(
            "ars_privada".parse::<ArsFilter>().unwrap(),
            ArsFilter::Only(ArsType::Privada)
        );
        assert_eq!(
            "publica".parse::<ArsFilter>().unwrap(),
            ArsFilter::Only(ArsType::Publica)
        );
        assert!(matches!(
            "mixta".parse::<ArsFilter>(),
            Err(Error::InvalidFilter(_))
        ));
        assert_eq!(ArsFilter::Only(ArsType::Autogestion).to_string(), "ars_autogestion");
    }

    #[test]
    fn test_options() {
        let store = sample_store();
        let years = year_options(&store);
        assert_eq!(years[0].value, "all");
        assert_eq!(years.len(), 1 + 17);
        assert_eq!(years[1].value, "2007");

        let ars = ars_options();
        let labels: Vec<&str> = ars.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["All", "Pública", "Privada", "Autogestión"]);
        assert_eq!(ars[3].value, "ars_autogestion");
    }

    #[test]
    fn test_line_chart_year_filter() {
        let store = sample_store();
        let all = siniestralidad_line(&store, YearFilter::All);
        assert_eq!(all.traces[0].points.len(), 204);

        let one = siniestralidad_line(&store, YearFilter::Year(2019));
        let points = &one.traces[0].points;
        assert_eq!(points.len(), 12);
        assert!(points.iter().all(|p| p.date.year() == 2019));

        let none = siniestralidad_line(&store, YearFilter::Year(1990));
        assert!(none.traces[0].points.is_empty());
    }

    #[test]
    fn test_bar_chart_single_ars() {
        let store = sample_store();
        let privada = ArsFilter::Only(ArsType::Privada);
        let chart = siniestralidad_by_ars(&store, YearFilter::Year(2020), privada);
        assert_eq!(chart.years, vec![2020]);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].ars, ArsType::Privada);
        assert_eq!(chart.title, "Siniestralidad ars_privada");
        assert_eq!(chart.mode, BarMode::Group);

        let grouped = siniestralidad_by_ars(&store, YearFilter::All, ArsFilter::All);
        assert_eq!(grouped.series.len(), 3);
        assert_eq!(grouped.years.len(), 17);
        assert!(grouped.series.iter().all(|s| s.values.len() == 17));
    }

    #[test]
    fn test_amount_charts_are_stacked() {
        let store = sample_store();
        let charts = amounts_by_ars(&store, YearFilter::Year(2015), ArsFilter::All);
        assert_eq!(charts.gastos.mode, BarMode::Stack);
        assert_eq!(charts.ingresos.title, "Ingresos por ARS");
        assert_eq!(charts.gastos.years, vec![2015]);
        assert_eq!(charts.gastos.y_label, AMOUNT_LABEL);
    }

    #[test]
    fn test_trend_summary_latest_year_and_mean_of_means() {
        let store = sample_store();
        let summary = trend_summary(&store, YearFilter::All).unwrap();
        assert_eq!(summary.year, 2023);

        let row = store.siniestralidad_by_ars().year(2023)[0];
        let expected = (row.publica + row.privada + row.autogestion) / 3.0;
        assert!((summary.siniestralidad_promedio - expected).abs() < 1e-9);
    }

    #[test]
    fn test_trend_summary_missing_year() {
        let store = sample_store();
        assert!(matches!(
            trend_summary(&store, YearFilter::Year(1990)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_forecast_chart_clamps_horizon() {
        let store = sample_store();
        let engine = engine_for(&store);
        let settings = ForecastConfig::default();

        let chart = forecast_chart(&engine, &store, 24, &settings).unwrap();
        assert_eq!(chart.horizon, 24);
        assert_eq!(chart.forecast.points.len(), 24);
        assert_eq!(chart.forecast.name, "Predicciones");
        assert_eq!(chart.history.points.len(), 204);

        let clamped = forecast_chart(&engine, &store, 500, &settings).unwrap();
        assert_eq!(clamped.forecast.points.len(), 60);

        let negative = forecast_chart(&engine, &store, -3, &settings).unwrap();
        assert_eq!(negative.horizon, 0);
        assert!(negative.forecast.points.is_empty());

        let huge = forecast_chart(&engine, &store, i64::MAX, &settings).unwrap();
        assert_eq!(huge.horizon, 60);
    }

    #[test]
    fn test_forecast_chart_with_unvalidated_max() {
        let store = sample_store();
        let engine = engine_for(&store);
        let settings = ForecastConfig {
            max_horizon: -1,
            ..Default::default()
        };
        let chart = forecast_chart(&engine, &store, 12, &settings).unwrap();
        assert_eq!(chart.horizon, 0);
        assert!(chart.forecast.points.is_empty());
    }

    #[test]
    fn test_forecast_chart_requires_fitted_engine() {
        let store = sample_store();
        let engine = ForecastEngine::new(ModelSpec::claims_ratio(), FitOptions::default());
        assert!(matches!(
            forecast_chart(&engine, &store, 12, &ForecastConfig::default()),
            Err(Error::ModelNotFitted)
        ));
        assert!(matches!(in_sample_chart(&engine), Err(Error::ModelNotFitted)));
    }

    #[test]
    fn test_in_sample_chart_traces() {
        let store = sample_store();
        let engine = engine_for(&store);
        let chart = in_sample_chart(&engine).unwrap();
        assert_eq!(chart.traces.len(), 2);
        assert_eq!(chart.traces[1].points.len(), chart.traces[0].points.len());
    }
}
