//! Medlex — incremental Medline/PubMed citation loader.
//! Entry point for the ingestion binary.

use std::path::PathBuf;

use clap::Parser;
use medlex_db::Database;
use medlex_ingestion::{run_ingestion, RunConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "medlex", version, about = "Load Medline/PubMed XML into a relational store")]
struct Cli {
    /// Directory scanned recursively for .xml and .xml.gz citation files
    #[arg(short, long)]
    input: PathBuf,

    /// Store URL
    #[arg(short, long, default_value = "sqlite://medlex.db?mode=rwc")]
    database: String,

    /// Drop and recreate the store schema before loading
    #[arg(long)]
    reset: bool,

    /// Index of the first file to load, after sorting and screening
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Exclusive end index; omit to run to the end of the list
    #[arg(long)]
    end: Option<usize>,

    /// Concurrent worker tasks, each handling a contiguous file chunk
    #[arg(short, long, default_value_t = 2)]
    workers: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("medlex=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Medlex starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(&cli.database, (cli.workers as u32).max(1) * 2).await?;
    if cli.reset {
        info!("--reset given: dropping and recreating the store schema");
        db.reset_schema().await?;
    } else {
        db.create_schema().await?;
    }

    let config = RunConfig {
        input_dir: cli.input,
        workers: cli.workers,
        start: cli.start,
        end: cli.end,
    };
    let report = run_ingestion(config, db.clone()).await?;

    let stats = db.stats().await?;
    info!(
        "Run complete: {} files processed, {} skipped, {} failed; \
         {} citations inserted, {} skipped, {} failed in {} ms",
        report.files_processed,
        report.files_skipped,
        report.files_failed,
        report.citations_inserted,
        report.citations_skipped,
        report.citations_failed,
        report.duration_ms,
    );
    info!(
        "Store now holds {} citations from {} files",
        stats.citations, stats.xml_files
    );
    Ok(())
}
