//! Monthly usage table and the growth-model resolver.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use indexmap::IndexMap;
use log::debug;

use crate::core::error::{Error, Result};
use crate::core::growth_model::GrowthModel;
use crate::core::series::Series;
use crate::core::table::{Cell, Table};

/// Monthly usage metrics keyed by field name.
///
/// Columns are append-only; the month axis is the sorted union of all column
/// indexes. Once resolution completes, every column covers the full axis.
#[derive(Debug, Clone, Default)]
pub struct UsageTable {
    columns: IndexMap<String, Series>,
}

impl UsageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted union of all column month indexes.
    pub fn months(&self) -> Vec<NaiveDate> {
        let mut months = BTreeSet::new();
        for series in self.columns.values() {
            months.extend(series.months());
        }
        months.into_iter().collect()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.columns.contains_key(field)
    }

    pub fn series(&self, field: &str) -> Result<&Series> {
        self.columns
            .get(field)
            .ok_or_else(|| Error::MissingField(field.to_string()))
    }

    /// Value of a field at a month, failing fast on gaps.
    pub fn value(&self, field: &str, month: NaiveDate) -> Result<f64> {
        self.series(field)?.get(month).ok_or(Error::MissingMonth {
            field: field.to_string(),
            month,
        })
    }

    /// Adds a column; the name must be new.
    pub fn insert(&mut self, name: &str, series: Series) -> Result<()> {
        if self.columns.contains_key(name) {
            return Err(Error::DuplicateField(name.to_string()));
        }
        self.columns.insert(name.to_string(), series);
        Ok(())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks that every column covers the full month axis.
    pub fn check_complete(&self) -> Result<()> {
        for month in self.months() {
            for (field, series) in &self.columns {
                if series.get(month).is_none() {
                    return Err(Error::MissingMonth {
                        field: field.clone(),
                        month,
                    });
                }
            }
        }
        Ok(())
    }

    /// The full table as a generic report table (rows = months).
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(
            "Usage",
            "Dates",
            self.fields().map(str::to_string).collect(),
        );
        for month in self.months() {
            let cells = self
                .columns
                .values()
                .map(|series| series.get(month).map(Cell::from_count).unwrap_or(Cell::Empty))
                .collect();
            table.push_month_row(month, cells);
        }
        table
    }
}

/// Resolves a set of growth models into a complete usage table.
///
/// Models run as soon as their dependent fields are present; passes over the
/// pending set repeat until it drains. A pass without progress means the
/// remaining models can never run, and resolution fails naming all of them.
/// The pass count is bounded by the model count.
pub fn resolve_usage(models: Vec<GrowthModel>) -> Result<UsageTable> {
    let mut seen = HashSet::new();
    for model in &models {
        if !seen.insert(model.name().to_string()) {
            return Err(Error::DuplicateField(model.name().to_string()));
        }
    }

    let mut table = UsageTable::new();
    let mut pending = models;
    let mut pass = 0;
    while !pending.is_empty() {
        pass += 1;
        let before = pending.len();
        let mut still_pending = Vec::new();
        for model in pending {
            if model.can_run(&table) {
                debug!("pass {}: resolving usage field '{}'", pass, model.name());
                let series = model.produce(&table)?;
                table.insert(model.name(), series)?;
            } else {
                still_pending.push(model);
            }
        }
        if still_pending.len() == before {
            let stuck = still_pending
                .iter()
                .map(|model| model.name().to_string())
                .collect();
            return Err(Error::UnmetDependencies(stuck));
        }
        pending = still_pending;
    }

    table.check_complete()?;
    debug!(
        "resolved {} usage fields over {} months in {} passes",
        table.column_count(),
        table.months().len(),
        pass
    );
    Ok(table)
}
