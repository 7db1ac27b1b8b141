//! CLI entry point for the no-show rater.
//!
//! Provides subcommands for summarising an appointment dataset, grouping it
//! by a key, correlating attributes with the no-show outcome, and writing a
//! full JSON report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use noshow_rater::analyzers::aggregate::{GroupOptions, group_by};
use noshow_rater::analyzers::analyzer::analyze;
use noshow_rater::analyzers::correlation::{correlate_groups, correlate_records};
use noshow_rater::analyzers::summary::summarize;
use noshow_rater::analyzers::types::{GroupKey, Variable};
use noshow_rater::{
    cleaning::load_appointments,
    config::PipelineConfig,
    output::{print_json, print_pretty, render_table, write_groups_csv, write_report_json},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "noshow_rater")]
#[command(about = "A tool to analyze appointment no-show rates", long_about = None)]
struct Cli {
    /// JSON pipeline config (falls back to NOSHOW_RATER_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Field delimiter of the input file, overriding the config
    #[arg(short, long, global = true)]
    delimiter: Option<char>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a dataset and print its summary statistics
    Summary {
        /// Appointment CSV (optionally .gz)
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Log the summary as JSON instead of the debug dump
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Group records by a key and print per-group no-show rates
    Group {
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Grouping key, e.g. age, age-band:10, weekday, sms, condition:diabetes
        #[arg(short, long)]
        by: GroupKey,

        /// Also compute each group's rate relative to the overall rate
        #[arg(short, long, default_value_t = false)]
        relative: bool,

        /// Leave out groups with fewer members
        #[arg(long, default_value_t = 1)]
        min_group_size: usize,

        /// CSV file to write the groups to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Correlate a variable (or a grouping's key) with the no-show outcome
    Correlate {
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Record-level variable: age, wait, sms, month, weekday, day-of-year, handicap
        #[arg(long, required_unless_present = "by", conflicts_with = "by")]
        var: Option<Variable>,

        /// Correlate group keys with group rates instead
        #[arg(long)]
        by: Option<GroupKey>,
    },
    /// Run every analysis and write a JSON report
    Report {
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Grouping keys to include (repeatable; defaults to all standard keys)
        #[arg(long = "by")]
        keys: Vec<GroupKey>,

        /// Leave out groups with fewer members
        #[arg(long, default_value_t = 1)]
        min_group_size: usize,

        /// JSON file to write the report to
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Gzip compress the report
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/noshow_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("noshow_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config, cli.delimiter)?;

    match cli.command {
        Commands::Summary { source, json } => {
            let (records, cleaning) = load(&source, &config)?;
            let summary = summarize(&records);

            info!(
                records = summary.records,
                no_shows = summary.no_shows,
                no_show_rate = summary.no_show_rate,
                dropped = cleaning.dropped(),
                "Dataset summary"
            );
            info!(
                mean = summary.age.mean,
                std_dev = summary.age.std_dev,
                ci95 = summary.age.ci95,
                "Age"
            );
            info!(
                mean = summary.wait_days.mean,
                std_dev = summary.wait_days.std_dev,
                ci95 = summary.wait_days.ci95,
                "Wait days"
            );
            for c in &summary.conditions {
                info!(
                    condition = %c.condition,
                    count = c.count,
                    prevalence = c.prevalence,
                    no_show_rate = c.no_show_rate,
                    "Condition"
                );
            }
            if json {
                print_json(&summary)?;
            } else {
                print_pretty(&summary);
            }
        }
        Commands::Group {
            source,
            by,
            relative,
            min_group_size,
            output,
        } => {
            let (records, _) = load(&source, &config)?;
            let opts = GroupOptions {
                relative,
                min_group_size,
            };
            let grouped = group_by(&records, by, &opts);

            println!("{}", render_table(&grouped));

            if let Some(output) = output {
                write_groups_csv(&output, &grouped)?;
                info!(path = %output.display(), groups = grouped.groups.len(), "Groups written");
            }
        }
        Commands::Correlate { source, var, by } => {
            let (records, _) = load(&source, &config)?;

            let (subject, correlation) = match (var, by) {
                (Some(variable), _) => (variable.to_string(), correlate_records(&records, variable)),
                (None, Some(key)) => {
                    let grouped = group_by(&records, key, &GroupOptions::default());
                    (format!("{key} (grouped)"), correlate_groups(&grouped))
                }
                (None, None) => anyhow::bail!("either --var or --by is required"),
            };

            println!("{subject}: {correlation}");
        }
        Commands::Report {
            source,
            keys,
            min_group_size,
            output,
            gzip,
        } => {
            let opts = GroupOptions {
                relative: true,
                min_group_size,
            };
            let report = analyze(&source, &config, &keys, &opts)?;

            write_report_json(&output, &report, gzip)?;
        }
    }

    Ok(())
}

/// Reads the pipeline config from `path` or `NOSHOW_RATER_CONFIG`, falling back to defaults.
fn load_config(path: Option<PathBuf>, delimiter: Option<char>) -> Result<PipelineConfig> {
    let path = path.or_else(|| std::env::var_os("NOSHOW_RATER_CONFIG").map(PathBuf::from));

    let mut config = match path {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(delimiter) = delimiter {
        config.delimiter = delimiter;
        config.validate()?;
    }

    Ok(config)
}

fn load(
    source: &Path,
    config: &PipelineConfig,
) -> Result<(
    Vec<noshow_rater::record::Appointment>,
    noshow_rater::cleaning::CleanReport,
)> {
    load_appointments(source, config)
        .with_context(|| format!("failed to load {}", source.display()))
}
