use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use dvr_config::EngineConfig;
use dvr_engine::ReconEngine;
use dvr_fx::NorgesBankSource;

#[derive(Parser)]
#[command(name = "dvr")]
#[command(about = "Dividend reconciliation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the NBIM book-of-record against a custodian feed
    Reconcile {
        /// NBIM dividend bookings CSV (semicolon-delimited)
        #[arg(long)]
        nbim: PathBuf,

        /// Custody dividend bookings CSV (semicolon-delimited)
        #[arg(long)]
        custody: PathBuf,

        /// Value date for benchmark rate lookups (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Optional YAML config overriding tolerances / thresholds
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // dev-time .env.local / .env bootstrap; absent files are fine
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Reconcile {
            nbim,
            custody,
            date,
            config,
            out,
        } => run_reconcile(nbim, custody, date, config, out).await,
    }
}

async fn run_reconcile(
    nbim_path: PathBuf,
    custody_path: PathBuf,
    date: NaiveDate,
    config_path: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = match config_path {
        Some(p) => EngineConfig::load_yaml(&p)?,
        None => EngineConfig::default(),
    };

    let nbim_legs = dvr_ingest::load_nbim_csv(&nbim_path)
        .with_context(|| format!("load nbim feed {}", nbim_path.display()))?;
    let custody_legs = dvr_ingest::load_custody_csv(&custody_path)
        .with_context(|| format!("load custody feed {}", custody_path.display()))?;
    tracing::info!(
        nbim = nbim_legs.len(),
        custody = custody_legs.len(),
        "feeds loaded"
    );

    let source = Arc::new(NorgesBankSource::with_base_url(
        config.benchmark.base_url.clone(),
        Duration::from_secs(config.benchmark.timeout_secs),
    ));
    let engine = ReconEngine::new(config, source);
    let report = engine.run(&nbim_legs, &custody_legs, date).await?;

    for (tier, count) in &report.priority_counts {
        tracing::info!(tier = %tier, count = *count, "open findings");
    }

    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
    match out {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("write report {}", path.display()))?;
            tracing::info!(path = %path.display(), run_id = %report.run_id, "report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
