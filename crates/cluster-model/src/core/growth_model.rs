//! Catalog of usage-growth models.
//!
//! Each model produces exactly one usage field. Source variants define their
//! own month axis; derived variants align to the table's axis and may only
//! read the fields they declare as dependencies.

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::core::config::{GrowthModelConfig, Param};
use crate::core::error::{Error, Result};
use crate::core::series::{month_range, parse_month, Series};
use crate::core::usage::UsageTable;

/// A named instance of one catalog variant.
///
/// Constructed once from configuration at the start of a resolution run and
/// consumed exactly once when it produces its column.
#[derive(Debug, Clone)]
pub struct GrowthModel {
    name: String,
    kind: GrowthModelKind,
}

/// The catalog variants, with scalar parameters already resolved.
#[derive(Debug, Clone)]
pub enum GrowthModelKind {
    /// Constant value over each month range.
    DateRangeValue {
        ranges: Vec<(NaiveDate, NaiveDate, f64)>,
    },
    /// Explicit per-month values.
    DateValue { values: Vec<(NaiveDate, f64)> },
    /// Running total of the input field.
    Cumulative { field: String, start_with: f64 },
    /// Running total where items expire after `lifespan` months.
    LimitedLifetime { field: String, lifespan: usize },
    /// Row-wise sum of the input fields.
    Sum { fields: Vec<String> },
    /// Input field scaled by a constant factor, with an optional one-time
    /// baseline added to the first row before scaling.
    Factor {
        field: String,
        factor: f64,
        start_with: f64,
    },
    /// Scaled baseline plus compounding monthly growth.
    BaselineWithGrowth {
        field: String,
        baseline_factor: f64,
        monthly_growth_factor: f64,
        start_with: f64,
    },
}

impl GrowthModel {
    /// Builds a model instance from its configuration, resolving any
    /// placeholder parameters against the scenario-set context.
    pub fn from_config(
        name: &str,
        config: &GrowthModelConfig,
        context: &IndexMap<String, f64>,
    ) -> Result<Self> {
        let resolve_opt = |param: &Option<Param>| -> Result<f64> {
            param.as_ref().map(|p| p.resolve(context)).transpose().map(|v| v.unwrap_or(0.0))
        };
        let kind = match config {
            GrowthModelConfig::DateRangeValue { ranges } => {
                let ranges = ranges
                    .iter()
                    .map(|(start, end, value)| {
                        let start = parse_month(start)?;
                        let end = parse_month(end)?;
                        if end < start {
                            return Err(Error::Config(format!(
                                "model '{}': range end precedes start",
                                name
                            )));
                        }
                        Ok((start, end, value.resolve(context)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                if ranges.is_empty() {
                    return Err(Error::Config(format!("model '{}' has no ranges", name)));
                }
                GrowthModelKind::DateRangeValue { ranges }
            }
            GrowthModelConfig::DateValue { values } => {
                let values = values
                    .iter()
                    .map(|(month, value)| Ok((parse_month(month)?, value.resolve(context)?)))
                    .collect::<Result<Vec<_>>>()?;
                if values.is_empty() {
                    return Err(Error::Config(format!("model '{}' has no values", name)));
                }
                GrowthModelKind::DateValue { values }
            }
            GrowthModelConfig::Cumulative {
                dependent_field,
                start_with,
            } => GrowthModelKind::Cumulative {
                field: dependent_field.clone(),
                start_with: resolve_opt(start_with)?,
            },
            GrowthModelConfig::CumulativeLimitedLifespan {
                dependent_field,
                lifespan,
            } => {
                if *lifespan == 0 {
                    return Err(Error::Config(format!(
                        "model '{}': lifespan must be positive",
                        name
                    )));
                }
                GrowthModelKind::LimitedLifetime {
                    field: dependent_field.clone(),
                    lifespan: *lifespan as usize,
                }
            }
            GrowthModelConfig::DerivedSum { dependent_fields } => {
                if dependent_fields.is_empty() {
                    return Err(Error::Config(format!(
                        "model '{}' has no dependent fields",
                        name
                    )));
                }
                GrowthModelKind::Sum {
                    fields: dependent_fields.clone(),
                }
            }
            GrowthModelConfig::DerivedFactor {
                dependent_field,
                factor,
                start_with,
            } => GrowthModelKind::Factor {
                field: dependent_field.clone(),
                factor: factor.resolve(context)?,
                start_with: resolve_opt(start_with)?,
            },
            GrowthModelConfig::BaselineWithGrowth {
                dependent_field,
                baseline_factor,
                monthly_growth_factor,
                start_with,
            } => GrowthModelKind::BaselineWithGrowth {
                field: dependent_field.clone(),
                baseline_factor: baseline_factor.resolve(context)?,
                monthly_growth_factor: monthly_growth_factor.resolve(context)?,
                start_with: resolve_opt(start_with)?,
            },
        };
        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &GrowthModelKind {
        &self.kind
    }

    /// Fields that must be present in the table before this model can run.
    pub fn dependent_fields(&self) -> Vec<&str> {
        match &self.kind {
            GrowthModelKind::DateRangeValue { .. } | GrowthModelKind::DateValue { .. } => Vec::new(),
            GrowthModelKind::Cumulative { field, .. }
            | GrowthModelKind::LimitedLifetime { field, .. }
            | GrowthModelKind::Factor { field, .. }
            | GrowthModelKind::BaselineWithGrowth { field, .. } => vec![field.as_str()],
            GrowthModelKind::Sum { fields } => fields.iter().map(String::as_str).collect(),
        }
    }

    /// True once all dependent fields are present in the table.
    pub fn can_run(&self, table: &UsageTable) -> bool {
        self.dependent_fields()
            .iter()
            .all(|field| table.contains(field))
    }

    /// Evaluates the model against the table built so far.
    pub fn produce(&self, table: &UsageTable) -> Result<Series> {
        match &self.kind {
            GrowthModelKind::DateRangeValue { ranges } => {
                let mut points = Vec::new();
                for (start, end, value) in ranges {
                    for month in month_range(*start, *end) {
                        points.push((month, *value));
                    }
                }
                Series::from_points(points).map_err(|_| {
                    Error::Config(format!("model '{}' has overlapping ranges", self.name))
                })
            }
            GrowthModelKind::DateValue { values } => {
                Series::from_points(values.clone()).map_err(|_| {
                    Error::Config(format!("model '{}' has duplicate months", self.name))
                })
            }
            GrowthModelKind::Cumulative { field, start_with } => {
                Ok(self.input(table, field)?.cumulative(*start_with))
            }
            GrowthModelKind::LimitedLifetime { field, lifespan } => {
                let cumulative = self.input(table, field)?.cumulative(0.0);
                let values: Vec<f64> = cumulative.values().collect();
                let points = cumulative
                    .months()
                    .enumerate()
                    .map(|(index, month)| {
                        let expired = if index >= *lifespan {
                            values[index - *lifespan]
                        } else {
                            0.0
                        };
                        (month, (values[index] - expired).trunc())
                    })
                    .collect();
                Series::from_points(points)
            }
            GrowthModelKind::Sum { fields } => {
                let mut points = Vec::new();
                for month in table.months() {
                    let mut total = 0.0;
                    for field in fields {
                        total += table.value(field, month)?;
                    }
                    points.push((month, total));
                }
                Series::from_points(points)
            }
            GrowthModelKind::Factor {
                field,
                factor,
                start_with,
            } => {
                let input = self.input(table, field)?;
                let points = input
                    .points()
                    .iter()
                    .enumerate()
                    .map(|(index, (month, value))| {
                        let base = if index == 0 { value + start_with } else { *value };
                        (*month, base * factor)
                    })
                    .collect();
                Series::from_points(points)
            }
            GrowthModelKind::BaselineWithGrowth {
                field,
                baseline_factor,
                monthly_growth_factor,
                start_with,
            } => {
                let input = self.input(table, field)?;
                let growth = input
                    .map(|value| value * monthly_growth_factor)
                    .cumulative(*start_with);
                let points = input
                    .points()
                    .iter()
                    .zip(growth.values())
                    .map(|((month, value), grown)| (*month, value * baseline_factor + grown))
                    .collect();
                Series::from_points(points)
            }
        }
    }

    /// Reads a dependent field over the table's full month axis, failing fast
    /// on any gap.
    fn input(&self, table: &UsageTable, field: &str) -> Result<Series> {
        let mut points = Vec::new();
        for month in table.months() {
            points.push((month, table.value(field, month)?));
        }
        Series::from_points(points)
    }
}
