//! Month-indexed numeric series and month arithmetic.

use chrono::{Datelike, NaiveDate};

use crate::core::error::{Error, Result};

/// Parses a month from "YYYY-MM", "YYYY-MM-DD" or "YYYYMMDD" input.
/// The result is pinned to the first day of the month.
pub fn parse_month(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    for format in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(first_of_month(date));
        }
    }
    NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
        .map_err(|_| Error::Config(format!("cannot parse month '{}'", input)))
}

/// Formats a month for report labels.
pub fn format_month(month: NaiveDate) -> String {
    month.format("%Y-%m-%d").to_string()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap()
}

/// First day of the month following `month`.
pub fn next_month(month: NaiveDate) -> NaiveDate {
    if month.month() == 12 {
        NaiveDate::from_ymd_opt(month.year() + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(month.year(), month.month() + 1, 1).unwrap()
    }
}

/// All months in `[start, end]`, inclusive, at monthly granularity.
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut months = Vec::new();
    let mut current = first_of_month(start);
    let end = first_of_month(end);
    while current <= end {
        months.push(current);
        current = next_month(current);
    }
    months
}

/// Number of whole months from `start` to `month` (negative if `month` is earlier).
pub fn months_between(start: NaiveDate, month: NaiveDate) -> i32 {
    (month.year() - start.year()) * 12 + month.month() as i32 - start.month() as i32
}

/// A numeric time series indexed by month, kept sorted chronologically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    points: Vec<(NaiveDate, f64)>,
}

impl Series {
    /// Builds a series from unordered points. Months must be unique.
    pub fn from_points(mut points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        points.sort_by_key(|(month, _)| *month);
        for pair in points.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(Error::Config(format!(
                    "duplicate month {} in series",
                    format_month(pair[0].0)
                )));
            }
        }
        Ok(Self { points })
    }

    /// A constant value over the given months.
    pub fn constant(months: &[NaiveDate], value: f64) -> Self {
        Self {
            points: months.iter().map(|month| (*month, value)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn months(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(month, _)| *month)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, value)| *value)
    }

    /// Value at the given month, if covered.
    pub fn get(&self, month: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&month, |(m, _)| *m)
            .ok()
            .map(|i| self.points[i].1)
    }

    pub fn first_month(&self) -> Option<NaiveDate> {
        self.points.first().map(|(month, _)| *month)
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }

    /// Applies `f` to every value, keeping the index.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Series {
        Series {
            points: self
                .points
                .iter()
                .map(|(month, value)| (*month, f(*value)))
                .collect(),
        }
    }

    /// Running sum of the values, with `start_with` added to the first row
    /// before summing.
    pub fn cumulative(&self, start_with: f64) -> Series {
        let mut total = start_with;
        Series {
            points: self
                .points
                .iter()
                .map(|(month, value)| {
                    total += value;
                    (*month, total)
                })
                .collect(),
        }
    }
}
