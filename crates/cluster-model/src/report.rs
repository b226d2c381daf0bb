//! Report writers rendering engine tables to the console or to CSV files.
//!
//! The engine side of the boundary is [`Table`]; everything here is
//! presentation: number formatting, column sizing, sheet layout.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::core::table::{Cell, Table};

/// Destination for rendered tables. A "sheet" groups related tables, like a
/// spreadsheet tab or a console section.
pub trait ReportWriter {
    fn write_table(&mut self, sheet: &str, table: &Table) -> io::Result<()>;

    /// Flushes any buffered output.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(text) => text.clone(),
        Cell::Int(value) => value.to_string(),
        Cell::Num(value) => format!("{:.1}", value),
        Cell::Empty => String::new(),
    }
}

/// Prints tables to stdout with fixed-width columns.
#[derive(Default)]
pub struct ConsoleWriter {
    current_sheet: Option<String>,
}

impl ConsoleWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportWriter for ConsoleWriter {
    fn write_table(&mut self, sheet: &str, table: &Table) -> io::Result<()> {
        if self.current_sheet.as_deref() != Some(sheet) {
            println!("\n========== {} ==========", sheet);
            self.current_sheet = Some(sheet.to_string());
        }
        println!("\n----- {} -----", table.title);

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 1);
        let mut header = vec![table.index_label.clone()];
        header.extend(table.columns.iter().cloned());
        rows.push(header);
        for (label, cells) in &table.rows {
            let mut row = vec![label.clone()];
            row.extend(cells.iter().map(format_cell));
            rows.push(row);
        }

        let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; column_count];
        for row in &rows {
            for (index, text) in row.iter().enumerate() {
                widths[index] = widths[index].max(text.len());
            }
        }

        for row in &rows {
            let mut line = String::new();
            for (index, text) in row.iter().enumerate() {
                if index == 0 {
                    line.push_str(&format!("{:<width$}", text, width = widths[index]));
                } else {
                    line.push_str(&format!("  {:>width$}", text, width = widths[index]));
                }
            }
            println!("{}", line.trim_end());
        }
        Ok(())
    }
}

/// Writes each sheet to `<dir>/<sheet>.csv`, appending tables separated by a
/// blank line. Stands in for spreadsheet output.
pub struct CsvWriter {
    dir: PathBuf,
    sheets: HashMap<String, csv::Writer<fs::File>>,
}

impl CsvWriter {
    /// Creates the output directory and an empty writer.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            sheets: HashMap::new(),
        })
    }

    fn sheet_writer(&mut self, sheet: &str) -> io::Result<&mut csv::Writer<fs::File>> {
        if !self.sheets.contains_key(sheet) {
            let file_name = format!("{}.csv", sheet.replace('/', "-"));
            let writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(self.dir.join(file_name))
                .map_err(into_io_error)?;
            self.sheets.insert(sheet.to_string(), writer);
        }
        Ok(self.sheets.get_mut(sheet).unwrap())
    }
}

fn into_io_error(error: csv::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, error)
}

impl ReportWriter for CsvWriter {
    fn write_table(&mut self, sheet: &str, table: &Table) -> io::Result<()> {
        let mut records: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 2);
        records.push(vec![table.title.clone()]);
        let mut header = vec![table.index_label.clone()];
        header.extend(table.columns.iter().cloned());
        records.push(header);
        for (label, cells) in &table.rows {
            let mut record = vec![label.clone()];
            record.extend(cells.iter().map(format_cell));
            records.push(record);
        }
        records.push(vec![String::new()]);

        let writer = self.sheet_writer(sheet)?;
        for record in records {
            writer.write_record(&record).map_err(into_io_error)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        for writer in self.sheets.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
