use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use log::info;

use cluster_model::core::config::ClusterConfig;
use cluster_model::core::error::{Error, Result};
use cluster_model::core::series::{format_month, parse_month};
use cluster_model::experiment::{apply_context, combined_sets, compare_sets, run_model, SetContext};
use cluster_model::report::{ConsoleWriter, CsvWriter, ReportWriter};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Projects cluster storage and compute capacity from a model config
struct Args {
    /// Path to YAML or JSON file with model configuration
    config: PathBuf,

    /// Directory for CSV output; {placeholders} are filled per scenario set.
    /// Output goes to the console when omitted
    #[arg(short, long)]
    output: Option<String>,

    /// Only run the model for this service
    #[arg(short, long)]
    service: Option<String>,

    /// Print the monthly values of this usage field
    #[arg(short, long)]
    usage: Option<String>,

    /// Only run this combined scenario set
    #[arg(long)]
    set: Option<String>,

    /// Summary dates (YYYY-MM), overriding the configured ones
    #[arg(short = 'd', long = "date")]
    dates: Vec<String>,
}

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() {
    init_logger();
    if let Err(error) = run(Args::parse()) {
        eprintln!("error: {}", error);
        exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = ClusterConfig::from_file(&args.config)?;

    if let Some(service) = &args.service {
        if !config.services.contains_key(service) {
            return Err(Error::Config(format!("unknown service '{}'", service)));
        }
        config.services.retain(|name, _| name == service);
    }

    let date_override = if args.dates.is_empty() {
        None
    } else {
        Some(
            args.dates
                .iter()
                .map(|date| parse_month(date))
                .collect::<Result<Vec<_>>>()?,
        )
    };

    let mut contexts = combined_sets(&config);
    if let Some(set) = &args.set {
        contexts.retain(|context| &context.name == set);
        if contexts.is_empty() {
            return Err(Error::Config(format!("unknown set '{}'", set)));
        }
    }

    let mut runs = Vec::new();
    for context in contexts {
        let run = run_model(&config, &context, date_override.clone())?;

        if let Some(field) = &args.usage {
            let series = run.usage.series(field)?;
            println!("\n{} ({})", field, context.name);
            for (month, value) in series.points() {
                println!("{}  {}", format_month(*month), value);
            }
        }

        let mut writer: Box<dyn ReportWriter> = match &args.output {
            Some(output) => {
                let path = apply_context(output, &context)?;
                info!("writing output for set '{}' to '{}'", context.name, path);
                Box::new(CsvWriter::new(path)?)
            }
            None => Box::new(ConsoleWriter::new()),
        };
        write_run(&mut *writer, &config, &run, args.output.is_some())?;
        writer.finish()?;
        runs.push(run);
    }

    if let Some(comparison) = compare_sets(&config, &runs)? {
        let context = SetContext {
            name: "comparison".to_string(),
            values: Default::default(),
        };
        let mut writer: Box<dyn ReportWriter> = match &args.output {
            Some(output) => {
                let path = apply_context(output, &context)?;
                info!("writing set comparison to '{}'", path);
                Box::new(CsvWriter::new(path)?)
            }
            None => Box::new(ConsoleWriter::new()),
        };
        for table in comparison.to_tables("") {
            writer.write_table("Set Comparison", &table)?;
        }
        writer.finish()?;
    }
    Ok(())
}

fn write_run(
    writer: &mut dyn ReportWriter,
    config: &ClusterConfig,
    run: &cluster_model::experiment::ModelRun,
    with_raw_data: bool,
) -> Result<()> {
    if let (Some(comparison), Some(incremental)) = (&run.comparison, &run.incremental) {
        for table in comparison.to_tables("") {
            writer.write_table("Comparison", &table)?;
        }
        for table in incremental.to_tables("Incremental ") {
            writer.write_table("Comparison", &table)?;
        }
    }

    for summary in &run.summaries {
        let sheet = format!("Summary ({})", format_month(summary.date));
        if let Some(users) = summary.users {
            info!("{}: {} users at {}", run.set.name, users, format_month(summary.date));
        }
        for table in summary.to_tables(config) {
            writer.write_table(&sheet, &table)?;
        }
    }

    // raw series are only worth keeping in spreadsheet form
    if with_raw_data {
        writer.write_table("Usage", &run.usage.to_table())?;
        for (service, resources) in &run.resources {
            writer.write_table("Raw Data", &resources.to_table(service))?;
        }
    }
    Ok(())
}
