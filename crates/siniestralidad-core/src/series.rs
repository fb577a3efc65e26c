//! Monthly time series
//!
//! A [`Series`] is a contiguous run of calendar months with one finite value
//! each. It is validated once at construction and never mutated afterwards,
//! which is what the seasonal model relies on: a gap or a duplicate month
//! would silently shift the period-12 lags.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A calendar month, e.g. 2023-12
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns None when `month` is outside 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The month `n` months after this one
    pub fn add_months(&self, n: u32) -> Self {
        let index = self.index() + n as i64;
        Self::from_index(index)
    }

    /// The month `n` months after this one, or None past the last
    /// representable year
    pub fn checked_add_months(&self, n: u64) -> Option<Self> {
        let index = self.index().checked_add(i64::try_from(n).ok()?)?;
        let year = i32::try_from(index.div_euclid(12)).ok()?;
        Some(Self {
            year,
            month: index.rem_euclid(12) as u32 + 1,
        })
    }

    /// Signed number of months from `earlier` to `self`
    pub fn months_since(&self, earlier: &YearMonth) -> i64 {
        self.index() - earlier.index()
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        // month is always 1..=12 and day 1 exists in every month
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Parses "YYYY-MM" (a single-digit month is accepted)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month: {} (use YYYY-MM)", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid year in month: {}", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month: {} (use YYYY-MM)", s))?;
        Self::new(year, month).ok_or_else(|| format!("Month out of range: {}", s))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One observation of the series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: YearMonth,
    pub value: f64,
}

impl TimePoint {
    pub fn new(date: YearMonth, value: f64) -> Self {
        Self { date, value }
    }
}

/// Contiguous monthly series, sorted ascending, no gaps or duplicates
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    points: Vec<TimePoint>,
}

impl Series {
    /// Validate and build a series
    ///
    /// Fails with [`Error::InvalidSeries`] when the points are empty,
    /// contain a non-finite value, or are not consecutive months.
    pub fn new(points: Vec<TimePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidSeries("series is empty".into()));
        }

        for point in &points {
            if !point.value.is_finite() {
                return Err(Error::InvalidSeries(format!(
                    "non-finite value at {}",
                    point.date
                )));
            }
        }

        for pair in points.windows(2) {
            let (prev, next) = (pair[0].date, pair[1].date);
            if next <= prev {
                return Err(Error::InvalidSeries(format!(
                    "dates must be strictly increasing ({} followed by {})",
                    prev, next
                )));
            }
            if next != prev.succ() {
                return Err(Error::InvalidSeries(format!(
                    "missing month(s) between {} and {}",
                    prev, next
                )));
            }
        }

        Ok(Self { points })
    }

    /// Build a series from consecutive values starting at `start`
    pub fn from_values(start: YearMonth, values: &[f64]) -> Result<Self> {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| TimePoint::new(start.add_months(i as u32), value))
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed series; present for API symmetry
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<YearMonth> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn start(&self) -> YearMonth {
        self.points[0].date
    }

    pub fn end(&self) -> YearMonth {
        self.points[self.points.len() - 1].date
    }

    /// Points falling in the given calendar year
    pub fn year(&self, year: i32) -> Vec<TimePoint> {
        self.points
            .iter()
            .filter(|p| p.date.year() == year)
            .copied()
            .collect()
    }
}
