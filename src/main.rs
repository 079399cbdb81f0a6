//! CLI entry point for the CSAT report tool.
//!
//! Loads a survey table once, runs every analysis over it, prints the
//! sectioned report and writes the chart images.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use csat_report::{
    analyzers::{
        aggregate::{GroupBy, aggregate},
        analyzer::{analyze, chart_specs},
        rank::{Direction, rank_groups},
    },
    charts::render_all,
    loader::load_table,
    output::{format_report, format_summary, write_json, write_ranking_csv},
    stats::Metric,
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

const DEFAULT_INPUT: &str = "analise_suporte.xlsx";

#[derive(Parser)]
#[command(name = "csat_report")]
#[command(about = "Descriptive statistics and charts for CSAT survey exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis, print the report and write the charts
    Report {
        /// Spreadsheet or CSV export to read
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Directory the chart images are written to
        #[arg(short = 'd', long, default_value = ".")]
        chart_dir: PathBuf,

        /// Skip chart rendering
        #[arg(long, default_value_t = false)]
        no_charts: bool,

        /// Also write the full report as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,

        /// Also write the attendant ranking as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print one grouped table ranked by a statistic
    Summary {
        /// Spreadsheet or CSV export to read
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Column to group on
        #[arg(short, long, value_enum, default_value_t = GroupBy::Attendant)]
        by: GroupBy,

        /// Statistic to rank by
        #[arg(short, long, value_enum, default_value_t = Metric::Mean)]
        sort: Metric,

        /// Rank in ascending order instead of descending
        #[arg(long, default_value_t = false)]
        ascending: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/csat_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("csat_report.log"));

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

    match cli.command {
        Commands::Report {
            input,
            chart_dir,
            no_charts,
            json,
            csv,
        } => {
            let table = load_table(&input)
                .with_context(|| format!("loading survey table from {}", input.display()))?;

            let report = analyze(&table);
            print!("{}", format_report(&report));

            if let Some(path) = json {
                write_json(&path, &report).context("exporting JSON report")?;
            }
            if let Some(path) = csv {
                write_ranking_csv(&path, &report).context("exporting ranking CSV")?;
            }

            if no_charts {
                info!("Chart rendering skipped");
            } else {
                let specs = chart_specs(&report);
                let written = render_all(&specs, &chart_dir).context("rendering charts")?;
                info!(
                    written = written.len(),
                    expected = specs.len(),
                    "Charts finished"
                );
            }
        }
        Commands::Summary {
            input,
            by,
            sort,
            ascending,
        } => {
            let table = load_table(&input)
                .with_context(|| format!("loading survey table from {}", input.display()))?;

            let direction = if ascending {
                Direction::Ascending
            } else {
                Direction::Descending
            };
            let ranked = rank_groups(aggregate(&table, by), sort, direction);
            print!("{}", format_summary(by, sort, &ranked));
        }
    }

    Ok(())
}
