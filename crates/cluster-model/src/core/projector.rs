//! Derives per-service compute and storage series from resolved usage.
//!
//! The evaluation order per service is fixed: node sizing, raw data storage,
//! storage-pressure nodes, RAM-pressure nodes, OS storage, HA duplication.
//! Node counts are always rounded up; storage and RAM stay fractional until
//! display rounding in the summarizer.

use chrono::NaiveDate;
use indexmap::IndexMap;
use log::debug;

use crate::core::config::{ClusterConfig, NodeSizing, RedundancyConfig, ServiceConfig};
use crate::core::error::{Error, Result};
use crate::core::series::Series;
use crate::core::table::{Cell, Table};
use crate::core::usage::UsageTable;

const BYTES_PER_GB: f64 = 1e9;

/// Projected resource series for one service, all on the usage table's axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResources {
    pub nodes: Series,
    pub cores: Series,
    pub ram_gb: Series,
    pub data_storage_bytes: Series,
    pub os_storage_bytes: Series,
    /// Nodes added on top of the sizing strategy by the storage ceiling.
    pub storage_pressure_nodes: Series,
    /// Nodes added on top of the sizing strategy by the RAM model.
    pub ram_pressure_nodes: Series,
}

/// Point-in-time view of a service's resources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSnapshot {
    pub nodes: f64,
    pub cores: f64,
    pub ram_gb: f64,
    pub data_storage_bytes: f64,
    pub os_storage_bytes: f64,
}

impl ServiceResources {
    /// Snapshot at one month, if projected.
    pub fn at(&self, month: NaiveDate) -> Option<ResourceSnapshot> {
        Some(ResourceSnapshot {
            nodes: self.nodes.get(month)?,
            cores: self.cores.get(month)?,
            ram_gb: self.ram_gb.get(month)?,
            data_storage_bytes: self.data_storage_bytes.get(month)?,
            os_storage_bytes: self.os_storage_bytes.get(month)?,
        })
    }

    /// The full projection as a generic report table (rows = months).
    pub fn to_table(&self, service: &str) -> Table {
        let columns = [
            "Nodes",
            "Cores",
            "RAM (GB)",
            "Data Storage (bytes)",
            "OS Storage (bytes)",
            "Storage Pressure Nodes",
            "RAM Pressure Nodes",
        ]
        .iter()
        .map(|column| column.to_string())
        .collect();
        let mut table = Table::new(service, "Dates", columns);
        for (month, nodes) in self.nodes.points() {
            let cells = vec![
                Cell::from_count(*nodes),
                Cell::from_count(self.cores.get(*month).unwrap_or(0.0)),
                Cell::Num(self.ram_gb.get(*month).unwrap_or(0.0)),
                Cell::Num(self.data_storage_bytes.get(*month).unwrap_or(0.0)),
                Cell::Num(self.os_storage_bytes.get(*month).unwrap_or(0.0)),
                Cell::from_count(self.storage_pressure_nodes.get(*month).unwrap_or(0.0)),
                Cell::from_count(self.ram_pressure_nodes.get(*month).unwrap_or(0.0)),
            ];
            table.push_month_row(*month, cells);
        }
        table
    }
}

/// Projects every configured service against the resolved usage table.
pub fn project_services(
    config: &ClusterConfig,
    usage: &UsageTable,
) -> Result<IndexMap<String, ServiceResources>> {
    let mut projected = IndexMap::new();
    for (name, service) in &config.services {
        projected.insert(name.clone(), project_service(config, name, service, usage)?);
    }
    Ok(projected)
}

fn project_service(
    config: &ClusterConfig,
    name: &str,
    service: &ServiceConfig,
    usage: &UsageTable,
) -> Result<ServiceResources> {
    let months = usage.months();
    let process = &service.process;

    // 1. node count from the sizing strategy
    let mut nodes = Vec::with_capacity(months.len());
    let mut cores = Vec::with_capacity(months.len());
    let mut ram = Vec::with_capacity(months.len());
    match service.node_sizing()? {
        NodeSizing::Static(number) => {
            for _ in &months {
                nodes.push(number as f64);
                cores.push(number as f64 * process.cores_per_node.unwrap_or(0.0));
                ram.push(number as f64 * process.ram_per_node.unwrap_or(0.0));
            }
        }
        NodeSizing::UsageCapacity { capacity, min_nodes } => {
            for month in &months {
                let used = usage.value(&service.usage_field, *month)?;
                let count = (used / capacity).ceil().max(min_nodes as f64);
                nodes.push(count);
                cores.push(count * process.cores_per_node.unwrap_or(0.0));
                ram.push(count * process.ram_per_node.unwrap_or(0.0));
            }
        }
        NodeSizing::SubProcesses(process) => {
            let cores_per_sub = process.cores_per_sub_process.unwrap_or(0.0);
            let ram_per_sub = process.ram_per_sub_process.unwrap_or(0.0);
            let cores_per_node = process.cores_per_node.unwrap_or(1.0);
            let ram_per_node = process.ram_per_node.unwrap_or(1.0);
            let mut by_cores = Vec::with_capacity(months.len());
            let mut by_ram = Vec::with_capacity(months.len());
            for month in &months {
                let mut total = 0.0;
                for sub_process in &process.sub_processes {
                    total += match (sub_process.static_number, sub_process.capacity) {
                        (Some(number), _) => number as f64,
                        (None, Some(capacity)) => {
                            let field =
                                sub_process.usage_field.as_deref().unwrap_or(&service.usage_field);
                            (usage.value(field, *month)? / capacity).ceil()
                        }
                        (None, None) => 0.0,
                    };
                }
                let month_cores = total * cores_per_sub;
                let month_ram = total * ram_per_sub;
                cores.push(month_cores);
                ram.push(month_ram);
                by_cores.push(month_cores / cores_per_node);
                by_ram.push(month_ram / ram_per_node);
            }
            // the binding dimension is whichever implies more nodes at the end
            let bound_by_cores = by_cores.last().unwrap_or(&0.0) > by_ram.last().unwrap_or(&0.0);
            let implied = if bound_by_cores { by_cores } else { by_ram };
            nodes = implied.iter().map(|count| count.ceil()).collect();
        }
    }

    // 2. raw data storage
    let baseline_bytes = service.storage.static_baseline.bytes()?;
    let mut data = Vec::with_capacity(months.len());
    for (index, month) in months.iter().enumerate() {
        let mut term_bytes = 0.0;
        for data_model in &service.storage.data_models {
            term_bytes +=
                usage.value(&data_model.referenced_field, *month)? * data_model.unit_size.bytes()?;
        }
        let redundancy = match &service.storage.redundancy_factor {
            RedundancyConfig::Static(factor) => *factor,
            RedundancyConfig::UsageDriven {
                referenced_field,
                factor,
            } => usage.value(referenced_field, *month)? * factor,
        };
        let mut month_bytes = term_bytes * redundancy + baseline_bytes;
        if service.storage_scales_with_nodes {
            month_bytes *= nodes[index];
        }
        data.push(month_bytes);
    }

    // 3. storage-capacity feedback
    let mut storage_pressure = vec![0.0; months.len()];
    if let Some(ceiling) = &service.max_storage_per_node {
        let max_bytes = ceiling.bytes()?;
        for index in 0..months.len() {
            let shortfall = data[index] - nodes[index] * max_bytes;
            if shortfall > 0.0 {
                let extra = (shortfall / max_bytes).ceil();
                storage_pressure[index] = extra;
                nodes[index] += extra;
            }
        }
    }

    // 4. RAM-capacity feedback
    let mut ram_pressure = vec![0.0; months.len()];
    if !process.ram_model.is_empty() {
        let usable_per_node = process.ram_per_node.unwrap_or(0.0) - process.ram_static_baseline;
        if usable_per_node <= 0.0 {
            return Err(Error::Config(format!(
                "service '{}': ram_model requires ram_per_node above ram_static_baseline",
                name
            )));
        }
        for (index, month) in months.iter().enumerate() {
            let mut required_gb = 0.0;
            for term in &process.ram_model {
                required_gb +=
                    usage.value(&term.referenced_field, *month)? * term.unit_size.bytes()?
                        / BYTES_PER_GB;
            }
            required_gb *= process.ram_redundancy_factor;
            let deficit = required_gb - nodes[index] * usable_per_node;
            if deficit > 0.0 {
                let extra = (deficit / usable_per_node).ceil();
                ram_pressure[index] = extra;
                nodes[index] += extra;
            }
        }
    }

    // 5. OS storage from the final node count
    let mut os = Vec::with_capacity(months.len());
    for index in 0..months.len() {
        os.push(nodes[index] * config.vm_os_storage_gb * BYTES_PER_GB);
    }

    // 6. HA duplication
    if service.high_availability {
        for series in [
            &mut nodes,
            &mut cores,
            &mut ram,
            &mut data,
            &mut os,
            &mut storage_pressure,
            &mut ram_pressure,
        ] {
            for value in series.iter_mut() {
                *value *= 2.0;
            }
        }
    }

    debug!(
        "projected service '{}': {} months, {} nodes at the final month",
        name,
        months.len(),
        nodes.last().copied().unwrap_or(0.0)
    );

    let series = |values: Vec<f64>| {
        Series::from_points(months.iter().copied().zip(values).collect())
    };
    Ok(ServiceResources {
        nodes: series(nodes)?,
        cores: series(cores)?,
        ram_gb: series(ram)?,
        data_storage_bytes: series(data)?,
        os_storage_bytes: series(os)?,
        storage_pressure_nodes: series(storage_pressure)?,
        ram_pressure_nodes: series(ram_pressure)?,
    })
}
