mod db;
mod fetch;
mod parser;
mod settings;
mod version;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use serde::Serialize;
use tracing::{info, warn};

use fetch::Fetcher;
use parser::assemble::DeviceRecord;
use parser::conventions::Conventions;
use parser::processors::ProcessorRecord;
use parser::Extraction;
use settings::Settings;
use version::Version;

#[derive(Parser)]
#[command(name = "appledata", about = "iPhone models, SoCs and iOS releases from Wikipedia tables")]
struct Cli {
    /// Configuration file (default: ./appledata.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract processors, versions and devices into the database
    Run {
        /// Fail when any table could not be extracted
        #[arg(long)]
        strict: bool,
        /// Read versions from the summary history page instead of per-release pages
        #[arg(long)]
        summary: bool,
    },
    /// Print device records extracted from the models page
    Devices {
        #[arg(long)]
        json: bool,
    },
    /// Print processors extracted from the systems-on-chips table
    Processors {
        #[arg(long)]
        json: bool,
    },
    /// Print firmware versions in page order
    Versions {
        #[arg(long)]
        summary: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show database counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let conventions = settings.conventions()?;

    let result = match cli.command {
        Commands::Run { strict, summary } => {
            run_pipeline(&settings, &conventions, strict, summary).await
        }
        Commands::Devices { json } => {
            let fetcher = Fetcher::new(&settings)?;
            let out = load_devices(&fetcher, &settings, &conventions).await?;
            report_failures("device", &out);
            print_records(&out.records, json)
        }
        Commands::Processors { json } => {
            let fetcher = Fetcher::new(&settings)?;
            let cpus = load_processors(&fetcher, &settings).await?;
            print_records(&cpus, json)
        }
        Commands::Versions { summary, json } => {
            let fetcher = Fetcher::new(&settings)?;
            let out = load_versions(&fetcher, &settings, summary).await?;
            report_failures("version", &out);
            print_records(&out.records, json)
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Processors:   {}", s.processors);
            println!("Devices:      {} ({} without cpu)", s.devices, s.devices_without_cpu);
            println!("Versions:     {}", s.versions);
            println!("Associations: {}", s.links);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

/// Processors first, then versions, then devices: device ranges are matched
/// against the versions already stored.
async fn run_pipeline(
    settings: &Settings,
    conventions: &Conventions,
    strict: bool,
    summary: bool,
) -> Result<()> {
    let fetcher = Fetcher::new(settings)?;
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    db::seed(&conn)?;
    info!("Database: {:?}", settings.db_path);

    let cpus = load_processors(&fetcher, settings).await?;
    let n = db::save_processors(&conn, &cpus)?;
    println!("Saved {} processors", n);

    let versions = load_versions(&fetcher, settings, summary).await?;
    let failed_version_tables = report_failures("version", &versions);
    let inserted = db::save_versions(&conn, &versions.records)?;
    println!("Found {} versions ({} new)", versions.records.len(), inserted);

    let devices = load_devices(&fetcher, settings, conventions).await?;
    let failed_device_tables = report_failures("device", &devices);
    for d in devices.records.iter().filter(|d| d.has_unset_fields()) {
        warn!("incomplete device record: {}", d);
    }
    let counts = db::save_devices(&conn, &devices.records)?;
    println!(
        "Saved {} devices ({} codenames, {} version links)",
        devices.records.len(),
        counts.devices,
        counts.links
    );

    let failed = failed_version_tables + failed_device_tables;
    if strict && failed > 0 {
        bail!("{} extraction failure(s)", failed);
    }
    Ok(())
}

async fn load_devices(
    fetcher: &Fetcher,
    settings: &Settings,
    conventions: &Conventions,
) -> Result<Extraction<DeviceRecord>> {
    let html = fetcher.load(&settings.models_url).await?;
    Ok(devices_from(&html, conventions))
}

async fn load_processors(fetcher: &Fetcher, settings: &Settings) -> Result<Vec<ProcessorRecord>> {
    let html = fetcher.load(&settings.soc_url).await?;
    Ok(processors_from(&html))
}

/// Each page is handled on its own; a page that fails to load is logged and skipped.
async fn load_versions(
    fetcher: &Fetcher,
    settings: &Settings,
    summary: bool,
) -> Result<Extraction<Version>> {
    if summary {
        let html = fetcher.load(&settings.version_history_url).await?;
        return Ok(summary_versions_from(&html));
    }

    let pb = ProgressBar::new(settings.version_pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut out = Extraction::default();
    for page in &settings.version_pages {
        pb.set_message(page.rsplit('/').next().unwrap_or(page).to_string());
        match fetcher.load(page).await {
            Ok(html) => {
                let found = release_versions_from(&html);
                info!("page {}: found {} versions", page, found.records.len());
                out.extend(found);
            }
            Err(e) => warn!("skipping {}: {:#}", page, e),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(out)
}

fn devices_from(html: &str, conventions: &Conventions) -> Extraction<DeviceRecord> {
    parser::extract_devices(&Html::parse_document(html), conventions)
}

fn processors_from(html: &str) -> Vec<ProcessorRecord> {
    parser::extract_processors(&Html::parse_document(html))
}

fn summary_versions_from(html: &str) -> Extraction<Version> {
    parser::extract_summary_versions(&Html::parse_document(html))
}

fn release_versions_from(html: &str) -> Extraction<Version> {
    parser::extract_release_versions(&Html::parse_document(html))
}

fn report_failures<T>(what: &str, out: &Extraction<T>) -> usize {
    for e in &out.failures {
        warn!(table = e.table(), "{} extraction failed: {}", what, e);
    }
    out.failures.len()
}

fn print_records<T: Serialize + std::fmt::Display>(records: &[T], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
    } else {
        for r in records {
            println!("{}", r);
        }
        println!("\n{} records", records.len());
    }
    Ok(())
}
