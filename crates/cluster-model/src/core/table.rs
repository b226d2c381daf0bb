//! Generic labeled tables, the boundary between the engine and report writers.
//!
//! The engine emits plain rows of labeled cells; sheet layout, number
//! formatting and column sizing belong entirely to the writers.

use chrono::NaiveDate;

use crate::core::series::format_month;

/// A single cell: text or a number. Numbers carry no formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Num(f64),
    Empty,
}

impl Cell {
    /// Numeric cell that collapses integral values to whole numbers.
    pub fn from_count(value: f64) -> Cell {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Cell::Int(value as i64)
        } else {
            Cell::Num(value)
        }
    }

    pub fn text(value: impl Into<String>) -> Cell {
        Cell::Text(value.into())
    }
}

/// Two-dimensional labeled result table.
#[derive(Debug, Clone)]
pub struct Table {
    pub title: String,
    pub index_label: String,
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<Cell>)>,
}

impl Table {
    pub fn new(title: impl Into<String>, index_label: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            title: title.into(),
            index_label: index_label.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, label: impl Into<String>, cells: Vec<Cell>) {
        self.rows.push((label.into(), cells));
    }

    /// Adds a row labeled with a formatted month.
    pub fn push_month_row(&mut self, month: NaiveDate, cells: Vec<Cell>) {
        self.push_row(format_month(month), cells);
    }
}
