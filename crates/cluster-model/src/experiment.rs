//! Scenario-set expansion and end-to-end model runs.

use chrono::NaiveDate;
use indexmap::IndexMap;
use log::info;

use crate::core::config::ClusterConfig;
use crate::core::error::{Error, Result};
use crate::core::growth_model::GrowthModel;
use crate::core::projector::{project_services, ServiceResources};
use crate::core::series::format_month;
use crate::core::summary::{compare_summaries, summarize, Summary, SummaryComparison};
use crate::core::usage::{resolve_usage, UsageTable};

/// One combined scenario-set context: a display name plus parameter values.
#[derive(Debug, Clone)]
pub struct SetContext {
    pub name: String,
    pub values: IndexMap<String, f64>,
}

impl SetContext {
    /// The context used when no sets are configured.
    pub fn default_run() -> Self {
        Self {
            name: "default".to_string(),
            values: IndexMap::new(),
        }
    }
}

/// Cartesian product of the configured set groups; a single "default"
/// context when no sets are configured. Combined names join the item names
/// with '-'; later groups override earlier context values on key collisions.
pub fn combined_sets(config: &ClusterConfig) -> Vec<SetContext> {
    if config.sets.is_empty() {
        return vec![SetContext::default_run()];
    }
    let mut contexts = vec![SetContext {
        name: String::new(),
        values: IndexMap::new(),
    }];
    for items in config.sets.values() {
        let mut combined = Vec::new();
        for context in &contexts {
            for item in items {
                let mut values = context.values.clone();
                for (key, value) in &item.values {
                    values.insert(key.clone(), *value);
                }
                let name = if context.name.is_empty() {
                    item.name.clone()
                } else {
                    format!("{}-{}", context.name, item.name)
                };
                combined.push(SetContext { name, values });
            }
        }
        contexts = combined;
    }
    contexts
}

/// Fills `{key}` markers in an output path from the set context.
/// `{name}` resolves to the combined set name; unknown markers are an error.
pub fn apply_context(path: &str, context: &SetContext) -> Result<String> {
    let mut filled = String::new();
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        filled.push_str(&rest[..open]);
        rest = &rest[open + 1..];
        let close = rest
            .find('}')
            .ok_or_else(|| Error::Config(format!("unbalanced '{{' in path '{}'", path)))?;
        let key = &rest[..close];
        if key == "name" {
            filled.push_str(&context.name);
        } else {
            let value = context
                .values
                .get(key)
                .ok_or_else(|| Error::UnknownPlaceholder(key.to_string()))?;
            if value.fract() == 0.0 {
                filled.push_str(&format!("{}", *value as i64));
            } else {
                filled.push_str(&format!("{}", value));
            }
        }
        rest = &rest[close + 1..];
    }
    filled.push_str(rest);
    Ok(filled)
}

/// Results of the full pipeline for one scenario-set context.
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub set: SetContext,
    pub usage: UsageTable,
    pub resources: IndexMap<String, ServiceResources>,
    /// One summary per requested date, sorted chronologically.
    pub summaries: Vec<Summary>,
    /// Date comparison, present when several summary dates are requested.
    pub comparison: Option<SummaryComparison>,
    pub incremental: Option<SummaryComparison>,
}

/// Runs the model once for one scenario-set context: resolve usage, project
/// services, summarize.
///
/// `summary_dates` overrides the configured dates; with neither, the final
/// projected month is summarized.
pub fn run_model(
    config: &ClusterConfig,
    context: &SetContext,
    summary_dates: Option<Vec<NaiveDate>>,
) -> Result<ModelRun> {
    info!("running model for set '{}'", context.name);
    let models = config
        .usage
        .iter()
        .map(|(name, model)| GrowthModel::from_config(name, model, &context.values))
        .collect::<Result<Vec<_>>>()?;
    let usage = resolve_usage(models)?;
    let resources = project_services(config, &usage)?;

    let mut dates = match summary_dates {
        Some(dates) => dates,
        None => config.summary_months()?,
    };
    if dates.is_empty() {
        let last = usage
            .months()
            .last()
            .copied()
            .ok_or_else(|| Error::Config("usage table is empty".to_string()))?;
        dates.push(last);
    }
    dates.sort();

    let summaries = dates
        .iter()
        .map(|date| summarize(config, &usage, &resources, *date))
        .collect::<Result<Vec<_>>>()?;
    let (comparison, incremental) = if summaries.len() > 1 {
        let labeled: Vec<(String, &Summary)> = summaries
            .iter()
            .map(|summary| (format_month(summary.date), summary))
            .collect();
        let comparison = compare_summaries(&labeled);
        let incremental = comparison.incremental();
        (Some(comparison), Some(incremental))
    } else {
        (None, None)
    };

    Ok(ModelRun {
        set: context.clone(),
        usage,
        resources,
        summaries,
        comparison,
        incremental,
    })
}

/// Compares scenario-set runs at the configured comparison date.
/// Empty unless several runs exist and `sets_summary_date` is configured.
pub fn compare_sets(config: &ClusterConfig, runs: &[ModelRun]) -> Result<Option<SummaryComparison>> {
    let date = match config.sets_summary_month()? {
        Some(date) if runs.len() > 1 => date,
        _ => return Ok(None),
    };
    let summaries = runs
        .iter()
        .map(|run| summarize(config, &run.usage, &run.resources, date))
        .collect::<Result<Vec<_>>>()?;
    let labeled: Vec<(String, &Summary)> = runs
        .iter()
        .zip(&summaries)
        .map(|(run, summary)| (run.set.name.clone(), summary))
        .collect();
    Ok(Some(compare_summaries(&labeled)))
}
