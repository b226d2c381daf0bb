//! Cluster model configuration.
//!
//! The configuration is read from a YAML or JSON document into serde structs
//! and validated eagerly: conflicting or incomplete definitions abort the run
//! before any computation starts.

use std::path::Path;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::series::parse_month;
use crate::core::units::{parse_bytes, DisplayUnit};

/// Scalar growth-model parameter: either a literal value or a
/// "{placeholder}" reference filled from the scenario-set context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Value(f64),
    Placeholder(String),
}

impl Param {
    /// Resolves the parameter against the set context.
    pub fn resolve(&self, context: &IndexMap<String, f64>) -> Result<f64> {
        match self {
            Param::Value(value) => Ok(*value),
            Param::Placeholder(text) => {
                let key = text
                    .trim()
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "parameter '{}' is neither a number nor a '{{placeholder}}'",
                            text
                        ))
                    })?;
                context
                    .get(key)
                    .copied()
                    .ok_or_else(|| Error::UnknownPlaceholder(key.to_string()))
            }
        }
    }
}

/// One configured usage-growth model. The `model` tag selects the catalog variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum GrowthModelConfig {
    /// Constant value over each `(start, end, value)` month range.
    DateRangeValue { ranges: Vec<(String, String, Param)> },
    /// Explicit `(month, value)` pairs.
    DateValue { values: Vec<(String, Param)> },
    /// Running total of another field.
    Cumulative {
        dependent_field: String,
        #[serde(default)]
        start_with: Option<Param>,
    },
    /// Running total where items expire after `lifespan` months.
    CumulativeLimitedLifespan {
        dependent_field: String,
        lifespan: u32,
    },
    /// Row-wise sum of other fields.
    DerivedSum { dependent_fields: Vec<String> },
    /// Another field scaled by a static factor.
    DerivedFactor {
        dependent_field: String,
        factor: Param,
        #[serde(default)]
        start_with: Option<Param>,
    },
    /// Scaled baseline plus compounding monthly growth.
    BaselineWithGrowth {
        dependent_field: String,
        baseline_factor: Param,
        monthly_growth_factor: Param,
        #[serde(default)]
        start_with: Option<Param>,
    },
}

/// A size written either as a bare byte count or as a string with a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    Bytes(f64),
    Display(String),
}

impl SizeSpec {
    pub fn bytes(&self) -> Result<f64> {
        match self {
            SizeSpec::Bytes(bytes) => Ok(*bytes),
            SizeSpec::Display(text) => parse_bytes(text),
        }
    }
}

impl Default for SizeSpec {
    fn default() -> Self {
        SizeSpec::Bytes(0.0)
    }
}

/// One data-size term: a usage field with a per-unit size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSizeConfig {
    pub referenced_field: String,
    pub unit_size: SizeSpec,
}

/// Replication multiplier: a fixed factor or another usage field scaled by a factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedundancyConfig {
    Static(f64),
    UsageDriven { referenced_field: String, factor: f64 },
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        RedundancyConfig::Static(1.0)
    }
}

/// Per-service storage definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Logical storage group used for summary aggregation.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub redundancy_factor: RedundancyConfig,
    /// Fixed storage present regardless of usage. Not subject to redundancy.
    #[serde(default)]
    pub static_baseline: SizeSpec,
    #[serde(default)]
    pub data_models: Vec<DataSizeConfig>,
    /// Overrides the global storage buffer for this service.
    #[serde(default)]
    pub override_storage_buffer: Option<f64>,
    /// Overrides the global estimation buffer for this service.
    #[serde(default)]
    pub override_estimation_buffer: Option<f64>,
}

/// Process sizing within a service node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub cores_per_node: Option<f64>,
    /// Node RAM capacity in GB.
    pub ram_per_node: Option<f64>,
    /// RAM reserved per node (GB), unavailable to the RAM model.
    #[serde(default)]
    pub ram_static_baseline: f64,
    /// Usage-driven RAM requirements; shortfalls force extra nodes.
    #[serde(default)]
    pub ram_model: Vec<DataSizeConfig>,
    #[serde(default = "default_redundancy")]
    pub ram_redundancy_factor: f64,
    pub cores_per_sub_process: Option<f64>,
    /// RAM per sub-process in GB.
    pub ram_per_sub_process: Option<f64>,
    #[serde(default)]
    pub sub_processes: Vec<SubProcessConfig>,
}

fn default_redundancy() -> f64 {
    1.0
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            cores_per_node: None,
            ram_per_node: None,
            ram_static_baseline: 0.0,
            ram_model: Vec::new(),
            ram_redundancy_factor: default_redundancy(),
            cores_per_sub_process: None,
            ram_per_sub_process: None,
            sub_processes: Vec::new(),
        }
    }
}

/// One sub-process of a service. Exactly one of `static_number` and
/// `capacity` must be given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubProcessConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Fixed number of processes.
    #[serde(default)]
    pub static_number: Option<u32>,
    /// Usage capacity of one process, e.g. 500 users per process.
    #[serde(default)]
    pub capacity: Option<f64>,
    /// Usage field driving this sub-process; defaults to the service's field.
    #[serde(default)]
    pub usage_field: Option<String>,
}

/// Per-service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Fixed node count sizing strategy.
    #[serde(default)]
    pub static_number: Option<u32>,
    /// Usage-per-node sizing strategy.
    #[serde(default)]
    pub usage_capacity_per_node: Option<f64>,
    /// Usage field driving compute for this service.
    #[serde(default = "default_usage_field")]
    pub usage_field: String,
    /// Every node carries a full copy of the data.
    #[serde(default)]
    pub storage_scales_with_nodes: bool,
    /// Storage ceiling per node; overflow forces extra nodes.
    #[serde(default)]
    pub max_storage_per_node: Option<SizeSpec>,
    #[serde(default)]
    pub min_nodes: u32,
    /// Doubles resource totals with an equal standby component.
    #[serde(default)]
    pub high_availability: bool,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub process: ProcessConfig,
}

fn default_usage_field() -> String {
    "users".to_string()
}

/// Node sizing strategy, exactly one per service.
pub enum NodeSizing<'a> {
    Static(u32),
    UsageCapacity { capacity: f64, min_nodes: u32 },
    SubProcesses(&'a ProcessConfig),
}

impl ServiceConfig {
    /// Returns the sizing strategy, rejecting configs where none or several apply.
    pub fn node_sizing(&self) -> Result<NodeSizing> {
        let mut configured = 0;
        if self.static_number.is_some() {
            configured += 1;
        }
        if self.usage_capacity_per_node.is_some() {
            configured += 1;
        }
        if !self.process.sub_processes.is_empty() {
            configured += 1;
        }
        if configured != 1 {
            return Err(Error::Config(format!(
                "exactly one of static_number, usage_capacity_per_node and \
                 sub_processes must be set, found {}",
                configured
            )));
        }
        if let Some(number) = self.static_number {
            return Ok(NodeSizing::Static(number));
        }
        if let Some(capacity) = self.usage_capacity_per_node {
            if capacity <= 0.0 {
                return Err(Error::Config(
                    "usage_capacity_per_node must be positive".to_string(),
                ));
            }
            return Ok(NodeSizing::UsageCapacity {
                capacity,
                min_nodes: self.min_nodes,
            });
        }
        Ok(NodeSizing::SubProcesses(&self.process))
    }

    fn validate(&self, name: &str) -> Result<()> {
        let annotate = |message: String| Error::Config(format!("service '{}': {}", name, message));

        match self.node_sizing().map_err(|err| annotate(err.to_string()))? {
            NodeSizing::SubProcesses(process) => {
                if process.cores_per_sub_process.is_none() || process.ram_per_sub_process.is_none() {
                    return Err(annotate(
                        "cores_per_sub_process and ram_per_sub_process are required \
                         when sub_processes are listed"
                            .to_string(),
                    ));
                }
                if process.cores_per_node.unwrap_or(0.0) <= 0.0
                    || process.ram_per_node.unwrap_or(0.0) <= 0.0
                {
                    return Err(annotate(
                        "cores_per_node and ram_per_node are required \
                         when sub_processes are listed"
                            .to_string(),
                    ));
                }
                for sub_process in &process.sub_processes {
                    let both = sub_process.static_number.is_some() && sub_process.capacity.is_some();
                    let neither =
                        sub_process.static_number.is_none() && sub_process.capacity.is_none();
                    if both || neither {
                        return Err(annotate(
                            "each sub-process needs exactly one of static_number and capacity"
                                .to_string(),
                        ));
                    }
                }
            }
            NodeSizing::Static(_) | NodeSizing::UsageCapacity { .. } => {}
        }

        if self.max_storage_per_node.is_some() && self.storage_scales_with_nodes {
            return Err(annotate(
                "max_storage_per_node is not compatible with storage_scales_with_nodes".to_string(),
            ));
        }
        if let Some(ceiling) = &self.max_storage_per_node {
            let bytes = ceiling.bytes().map_err(|err| annotate(err.to_string()))?;
            if bytes <= 0.0 {
                return Err(annotate("max_storage_per_node must be positive".to_string()));
            }
        }

        self.storage
            .static_baseline
            .bytes()
            .map_err(|err| annotate(err.to_string()))?;
        for data_model in &self.storage.data_models {
            data_model
                .unit_size
                .bytes()
                .map_err(|err| annotate(err.to_string()))?;
        }

        if !self.process.ram_model.is_empty() {
            for term in &self.process.ram_model {
                term.unit_size.bytes().map_err(|err| annotate(err.to_string()))?;
            }
            let ram_per_node = self.process.ram_per_node.unwrap_or(0.0);
            if ram_per_node <= self.process.ram_static_baseline {
                return Err(annotate(
                    "ram_model requires ram_per_node above ram_static_baseline".to_string(),
                ));
            }
        }

        for buffer in [
            self.storage.override_storage_buffer,
            self.storage.override_estimation_buffer,
        ]
        .into_iter()
        .flatten()
        {
            if buffer < 0.0 {
                return Err(annotate("buffer overrides must be non-negative".to_string()));
            }
        }
        Ok(())
    }
}

/// One item of a scenario-set group: a display name plus context values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetItemConfig {
    pub name: String,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
}

/// Top-level model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Margin covering estimation uncertainty, e.g. 0.2 for 20%.
    pub estimation_buffer: f64,
    /// Monthly compounding applied to the estimation buffer.
    #[serde(default)]
    pub estimation_growth_factor: f64,
    /// Extra margin applied to storage figures.
    pub storage_buffer: f64,
    #[serde(default)]
    pub storage_display_unit: DisplayUnit,
    /// Snapshot dates; the final projected month is used when empty.
    #[serde(default)]
    pub summary_dates: Vec<String>,
    /// Date at which scenario sets are compared to each other.
    #[serde(default)]
    pub sets_summary_date: Option<String>,
    /// OS disk size per node in decimal GB.
    pub vm_os_storage_gb: f64,
    /// Storage group collecting the OS disks of all services.
    pub vm_os_storage_group: String,
    #[serde(default)]
    pub usage: IndexMap<String, GrowthModelConfig>,
    #[serde(default)]
    pub services: IndexMap<String, ServiceConfig>,
    #[serde(default)]
    pub sets: IndexMap<String, Vec<SetItemConfig>>,
}

impl ClusterConfig {
    /// Loads and validates a config file; the format is chosen by extension
    /// (`.json` for JSON, anything else is parsed as YAML).
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let config: ClusterConfig = if is_json {
            serde_json::from_str(&text)?
        } else {
            serde_yaml::from_str(&text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: ClusterConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.estimation_buffer < 0.0 || self.storage_buffer < 0.0 {
            return Err(Error::Config("buffers must be non-negative".to_string()));
        }
        if self.vm_os_storage_gb < 0.0 {
            return Err(Error::Config("vm_os_storage_gb must be non-negative".to_string()));
        }
        if self.usage.is_empty() {
            return Err(Error::Config("no usage models configured".to_string()));
        }
        for (name, service) in &self.services {
            service.validate(name)?;
        }
        self.summary_months()?;
        self.sets_summary_month()?;
        for (group, items) in &self.sets {
            if items.is_empty() {
                return Err(Error::Config(format!("set group '{}' is empty", group)));
            }
        }
        Ok(())
    }

    /// Configured summary dates as months, sorted.
    pub fn summary_months(&self) -> Result<Vec<NaiveDate>> {
        let mut months = self
            .summary_dates
            .iter()
            .map(|date| parse_month(date))
            .collect::<Result<Vec<_>>>()?;
        months.sort();
        Ok(months)
    }

    /// The month at which scenario sets are compared, if configured.
    pub fn sets_summary_month(&self) -> Result<Option<NaiveDate>> {
        self.sets_summary_date
            .as_deref()
            .map(parse_month)
            .transpose()
    }
}
