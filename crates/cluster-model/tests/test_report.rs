use std::fs;

use cluster_model::core::table::{Cell, Table};
use cluster_model::report::{ConsoleWriter, CsvWriter, ReportWriter};

fn sample_table() -> Table {
    let mut table = Table::new(
        "Storage by Service",
        "Service",
        vec!["Total (GB)".to_string(), "Group".to_string()],
    );
    table.push_row("app", vec![Cell::Num(1.5), Cell::text("SSD")]);
    table.push_row("db", vec![Cell::Int(3), Cell::text("SAS")]);
    table
}

#[test]
fn test_console_writer_accepts_tables() {
    let mut writer = ConsoleWriter::new();
    writer.write_table("Summary", &sample_table()).unwrap();
    writer.write_table("Summary", &sample_table()).unwrap();
    writer.finish().unwrap();
}

// One CSV file per sheet; tables are appended with their title and header.
#[test]
fn test_csv_writer_writes_sheet_files() {
    let dir = std::env::temp_dir().join(format!("cluster-model-report-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);

    let mut writer = CsvWriter::new(&dir).unwrap();
    writer.write_table("Summary (2018-06-01)", &sample_table()).unwrap();
    writer.write_table("Summary (2018-06-01)", &sample_table()).unwrap();
    writer.write_table("Usage", &sample_table()).unwrap();
    writer.finish().unwrap();

    let summary = fs::read_to_string(dir.join("Summary (2018-06-01).csv")).unwrap();
    assert!(summary.contains("Storage by Service"));
    assert!(summary.contains("Service,Total (GB),Group"));
    assert!(summary.contains("app,1.5,SSD"));
    // two tables were appended to the same sheet
    assert_eq!(summary.matches("Storage by Service").count(), 2);
    assert!(dir.join("Usage.csv").exists());

    fs::remove_dir_all(&dir).unwrap();
}
