//! Snapshot summaries, buffering, display rounding, and comparisons.

use chrono::NaiveDate;
use indexmap::IndexMap;

use crate::core::config::{ClusterConfig, StorageConfig};
use crate::core::error::{Error, Result};
use crate::core::projector::ServiceResources;
use crate::core::series::{format_month, months_between};
use crate::core::table::{Cell, Table};
use crate::core::usage::UsageTable;

/// Rounds a displayed capacity figure to the power-of-ten step closest to
/// 10% of the value, always upward. Large projections carry no more than two
/// meaningful digits.
pub fn tenth_round(value: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    let step = 10f64.powf((value * 0.1).log10().round());
    (value / step).ceil() * step
}

/// Buffered summary figures for one service at a snapshot date.
///
/// Compute figures are raw counts; storage figures are converted to the
/// configured display unit, with the total tenth-rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSummary {
    pub service: String,
    pub group: String,
    pub nodes: f64,
    pub nodes_buffer: f64,
    pub nodes_total: f64,
    pub cores: f64,
    pub cores_buffer: f64,
    pub cores_total: f64,
    pub ram_gb: f64,
    pub ram_buffer_gb: f64,
    pub ram_total_gb: f64,
    pub storage: f64,
    pub storage_buffer: f64,
    pub storage_total: f64,
    pub os_storage: f64,
}

/// Aggregation of all projected services at one report date.
/// Immutable once computed; comparisons only read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub date: NaiveDate,
    /// Value of the "users" field at the date, when tracked.
    pub users: Option<f64>,
    pub services: Vec<ServiceSummary>,
    /// Synthetic row summing all numeric columns.
    pub total: ServiceSummary,
    /// Rounded storage totals summed by logical group, including the OS bucket.
    pub storage_by_group: Vec<(String, f64)>,
}

fn estimation_buffer(config: &ClusterConfig, storage: &StorageConfig, months_out: i32) -> f64 {
    let base = storage
        .override_estimation_buffer
        .unwrap_or(config.estimation_buffer);
    base * (1.0 + config.estimation_growth_factor).powi(months_out)
}

fn storage_buffer(config: &ClusterConfig, storage: &StorageConfig) -> f64 {
    storage.override_storage_buffer.unwrap_or(config.storage_buffer)
}

/// Summarizes every projected service at the given date.
pub fn summarize(
    config: &ClusterConfig,
    usage: &UsageTable,
    resources: &IndexMap<String, ServiceResources>,
    date: NaiveDate,
) -> Result<Summary> {
    let start = usage
        .months()
        .first()
        .copied()
        .ok_or_else(|| Error::Config("usage table is empty".to_string()))?;
    let months_out = months_between(start, date);
    let unit = config.storage_display_unit;

    let mut services = Vec::new();
    for (name, projected) in resources {
        let snapshot = projected.at(date).ok_or_else(|| {
            Error::Config(format!("no projected data for {}", format_month(date)))
        })?;
        let service_config = config
            .services
            .get(name)
            .ok_or_else(|| Error::MissingField(name.clone()))?;
        let estimation = estimation_buffer(config, &service_config.storage, months_out);
        let storage_margin = storage_buffer(config, &service_config.storage);

        let nodes_total = (snapshot.nodes * (1.0 + estimation)).ceil();
        let storage = unit.convert(snapshot.data_storage_bytes);
        let storage_factor = (1.0 + estimation) * (1.0 + storage_margin);
        services.push(ServiceSummary {
            service: name.clone(),
            group: service_config
                .storage
                .group
                .clone()
                .unwrap_or_else(|| name.clone()),
            nodes: snapshot.nodes,
            nodes_buffer: nodes_total - snapshot.nodes,
            nodes_total,
            cores: snapshot.cores,
            cores_buffer: snapshot.cores * estimation,
            cores_total: snapshot.cores * (1.0 + estimation),
            ram_gb: snapshot.ram_gb,
            ram_buffer_gb: snapshot.ram_gb * estimation,
            ram_total_gb: snapshot.ram_gb * (1.0 + estimation),
            storage,
            storage_buffer: storage * (storage_factor - 1.0),
            storage_total: tenth_round(storage * storage_factor),
            os_storage: unit.convert(snapshot.os_storage_bytes),
        });
    }

    let mut storage_by_group: IndexMap<String, f64> = IndexMap::new();
    for service in &services {
        *storage_by_group.entry(service.group.clone()).or_insert(0.0) +=
            service.storage_total;
    }
    let os_total = tenth_round(services.iter().map(|service| service.os_storage).sum());
    *storage_by_group
        .entry(config.vm_os_storage_group.clone())
        .or_insert(0.0) += os_total;

    Ok(Summary {
        date,
        users: usage.value("users", date).ok(),
        total: total_row(&services),
        services,
        storage_by_group: storage_by_group.into_iter().collect(),
    })
}

fn total_row(services: &[ServiceSummary]) -> ServiceSummary {
    let mut total = ServiceSummary {
        service: "Total".to_string(),
        group: String::new(),
        nodes: 0.0,
        nodes_buffer: 0.0,
        nodes_total: 0.0,
        cores: 0.0,
        cores_buffer: 0.0,
        cores_total: 0.0,
        ram_gb: 0.0,
        ram_buffer_gb: 0.0,
        ram_total_gb: 0.0,
        storage: 0.0,
        storage_buffer: 0.0,
        storage_total: 0.0,
        os_storage: 0.0,
    };
    for service in services {
        total.nodes += service.nodes;
        total.nodes_buffer += service.nodes_buffer;
        total.nodes_total += service.nodes_total;
        total.cores += service.cores;
        total.cores_buffer += service.cores_buffer;
        total.cores_total += service.cores_total;
        total.ram_gb += service.ram_gb;
        total.ram_buffer_gb += service.ram_buffer_gb;
        total.ram_total_gb += service.ram_total_gb;
        total.storage += service.storage;
        total.storage_buffer += service.storage_buffer;
        total.storage_total += service.storage_total;
        total.os_storage += service.os_storage;
    }
    total
}

impl Summary {
    /// Compute, storage and group tables for this snapshot.
    pub fn to_tables(&self, config: &ClusterConfig) -> Vec<Table> {
        let unit = config.storage_display_unit.label();
        let mut compute = Table::new(
            "Compute",
            "Service",
            vec![
                "Cores".to_string(),
                "Cores Buffer".to_string(),
                "Cores Total".to_string(),
                "RAM (GB)".to_string(),
                "RAM Buffer".to_string(),
                "RAM Total".to_string(),
                "Nodes".to_string(),
                "Nodes Buffer".to_string(),
                "Nodes Total".to_string(),
            ],
        );
        let mut storage = Table::new(
            "Storage by Service",
            "Service",
            vec![
                format!("Size ({})", unit),
                format!("Buffer ({})", unit),
                format!("Total ({})", unit),
                format!("OS Storage ({})", unit),
                "Group".to_string(),
            ],
        );
        for row in self.services.iter().chain(std::iter::once(&self.total)) {
            compute.push_row(
                row.service.clone(),
                vec![
                    Cell::Num(row.cores),
                    Cell::Num(row.cores_buffer),
                    Cell::Num(row.cores_total),
                    Cell::Num(row.ram_gb),
                    Cell::Num(row.ram_buffer_gb),
                    Cell::Num(row.ram_total_gb),
                    Cell::from_count(row.nodes),
                    Cell::from_count(row.nodes_buffer),
                    Cell::from_count(row.nodes_total),
                ],
            );
            storage.push_row(
                row.service.clone(),
                vec![
                    Cell::Num(row.storage),
                    Cell::Num(row.storage_buffer),
                    Cell::from_count(row.storage_total),
                    Cell::Num(row.os_storage),
                    Cell::text(row.group.clone()),
                ],
            );
        }
        let mut groups = Table::new(
            "Storage by Group",
            "Group",
            vec![format!("Total ({})", unit)],
        );
        for (group, total) in &self.storage_by_group {
            groups.push_row(group.clone(), vec![Cell::from_count(*total)]);
        }
        vec![compute, storage, groups]
    }
}

/// Summary columns aligned by label: one column per date or scenario set.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryComparison {
    pub labels: Vec<String>,
    /// Per service: storage group and the per-label storage totals.
    pub storage_by_service: Vec<(String, String, Vec<f64>)>,
    pub storage_by_group: Vec<(String, Vec<f64>)>,
    /// Per service and metric (Cores / RAM / Nodes): per-label totals.
    pub compute: Vec<(String, String, Vec<f64>)>,
}

/// Aligns labeled summaries into comparison columns.
///
/// Rows follow the first summary; every summary is expected to cover the same
/// services and groups, since they come from the same configuration.
pub fn compare_summaries(labeled: &[(String, &Summary)]) -> SummaryComparison {
    let labels: Vec<String> = labeled.iter().map(|(label, _)| label.clone()).collect();
    let mut storage_by_service = Vec::new();
    let mut compute = Vec::new();
    if let Some((_, first)) = labeled.first() {
        for (index, row) in first.services.iter().chain([&first.total]).enumerate() {
            let pick = |f: fn(&ServiceSummary) -> f64| -> Vec<f64> {
                labeled
                    .iter()
                    .map(|(_, summary)| {
                        summary
                            .services
                            .iter()
                            .chain([&summary.total])
                            .nth(index)
                            .map(f)
                            .unwrap_or(0.0)
                    })
                    .collect()
            };
            storage_by_service.push((
                row.service.clone(),
                row.group.clone(),
                pick(|row| row.storage_total),
            ));
            compute.push((row.service.clone(), "Cores".to_string(), pick(|row| row.cores_total)));
            compute.push((row.service.clone(), "RAM".to_string(), pick(|row| row.ram_total_gb)));
            compute.push((row.service.clone(), "Nodes".to_string(), pick(|row| row.nodes_total)));
        }
    }

    let mut storage_by_group: IndexMap<String, Vec<f64>> = IndexMap::new();
    for (column, (_, summary)) in labeled.iter().enumerate() {
        for (group, total) in &summary.storage_by_group {
            storage_by_group
                .entry(group.clone())
                .or_insert_with(|| vec![0.0; labeled.len()])[column] = *total;
        }
    }

    SummaryComparison {
        labels,
        storage_by_service,
        storage_by_group: storage_by_group.into_iter().collect(),
        compute,
    }
}

impl SummaryComparison {
    /// Period-over-period deltas: each column becomes the difference from the
    /// previous one; the first column is unchanged.
    pub fn incremental(&self) -> SummaryComparison {
        let delta = |values: &Vec<f64>| -> Vec<f64> {
            values
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    if index == 0 {
                        *value
                    } else {
                        value - values[index - 1]
                    }
                })
                .collect()
        };
        SummaryComparison {
            labels: self.labels.clone(),
            storage_by_service: self
                .storage_by_service
                .iter()
                .map(|(service, group, values)| (service.clone(), group.clone(), delta(values)))
                .collect(),
            storage_by_group: self
                .storage_by_group
                .iter()
                .map(|(group, values)| (group.clone(), delta(values)))
                .collect(),
            compute: self
                .compute
                .iter()
                .map(|(service, metric, values)| (service.clone(), metric.clone(), delta(values)))
                .collect(),
        }
    }

    /// Comparison tables; `prefix` distinguishes e.g. "Incremental " output.
    pub fn to_tables(&self, prefix: &str) -> Vec<Table> {
        let mut columns: Vec<String> = self.labels.clone();
        columns.push("Group".to_string());
        let mut storage = Table::new(
            format!("{}Storage by Service", prefix),
            "Service",
            columns,
        );
        for (service, group, values) in &self.storage_by_service {
            let mut cells: Vec<Cell> = values.iter().map(|value| Cell::from_count(*value)).collect();
            cells.push(Cell::text(group.clone()));
            storage.push_row(service.clone(), cells);
        }

        let mut groups = Table::new(
            format!("{}Storage by Group", prefix),
            "Group",
            self.labels.clone(),
        );
        for (group, values) in &self.storage_by_group {
            groups.push_row(
                group.clone(),
                values.iter().map(|value| Cell::from_count(*value)).collect(),
            );
        }

        let mut compute = Table::new(
            format!("{}Compute", prefix),
            "Service / Metric",
            self.labels.clone(),
        );
        for (service, metric, values) in &self.compute {
            compute.push_row(
                format!("{} / {}", service, metric),
                values.iter().map(|value| Cell::Num(*value)).collect(),
            );
        }
        vec![storage, groups, compute]
    }
}
