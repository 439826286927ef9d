use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use report_client::{FileReportSource, HttpReportSource, ReportService, ReportSource};
use report_core::{DiagnosticReportDetails, ReportConfig, ReportState};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "report-cli",
    about = "Fetch a FHIR diagnostic report bundle and print its observations."
)]
struct Args {
    /// Path to a local bundle JSON file.
    #[arg(short, long, conflicts_with = "url")]
    input: Option<PathBuf>,

    /// Bundle URL; defaults to the configured endpoint.
    #[arg(short, long)]
    url: Option<String>,

    /// Print the projected report as JSON.
    #[arg(long)]
    json: bool,

    /// Fail with the reason when the bundle yields no report.
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match (&args.input, &args.url) {
        (Some(path), _) => {
            tracing::info!(path = %path.display(), "using file report source");
            run(FileReportSource::new(path), &args).await
        }
        (None, Some(url)) => {
            let config = ReportConfig {
                base_url: url.clone(),
                report_path: String::new(),
                ..ReportConfig::from_env()
            };
            run(http_source(&config)?, &args).await
        }
        (None, None) => run(http_source(&ReportConfig::from_env())?, &args).await,
    }
}

fn http_source(config: &ReportConfig) -> anyhow::Result<HttpReportSource> {
    tracing::info!(endpoint = %config.endpoint(), "using HTTP report source");
    HttpReportSource::new(config).context("HTTP client setup failed")
}

async fn run<S: ReportSource>(source: S, args: &Args) -> anyhow::Result<()> {
    let report = if args.strict {
        let raw = source.fetch_raw_report().await?;
        let report = report_fhir::try_parse_report_str(&raw)
            .context("Bundle did not yield a diagnostic report")?;
        Some(report)
    } else {
        match ReportService::new(source).fetch_report().await {
            ReportState::Error(message) => bail!(message),
            ReportState::Success(report) => report,
            ReportState::Loading => None,
        }
    };

    tracing::info!(found = report.is_some(), "report fetch finished");

    match report {
        Some(report) if args.json => println!("{}", serde_json::to_string_pretty(&report)?),
        Some(report) => print_report(&report),
        None if args.json => println!("null"),
        None => println!("No diagnostic report found."),
    }

    Ok(())
}

fn print_report(report: &DiagnosticReportDetails) {
    println!("Report: {}", report.report_name);
    if !report.test_performers.is_empty() {
        println!("Performed by: {}", report.test_performers.join(", "));
    }
    if let Some(effective) = &report.effective_date_time {
        println!("Effective: {effective}");
    }
    println!("Observations: {}", report.observations.len());

    for observation in &report.observations {
        let value = match (&observation.value, &observation.unit) {
            (Some(value), Some(unit)) => format!("{value} {unit}"),
            (Some(value), None) => value.clone(),
            _ => "-".to_string(),
        };
        let range = match (observation.low, observation.high) {
            (None, None) => String::new(),
            (low, high) => format!(
                " [{} - {}]",
                low.map_or("?".to_string(), |v| v.to_string()),
                high.map_or("?".to_string(), |v| v.to_string())
            ),
        };
        let status = observation
            .range_status()
            .map(|status| format!(" ({status:?})"))
            .unwrap_or_default();
        println!("  {}: {value}{range}{status}", observation.observation_name);
    }
}
