// src/main.rs
mod corpus;
mod extractors;
mod registry;
mod storage;
mod utils;

use clap::Parser;
use corpus::{CorpusDriver, CorpusSummary};
use registry::client::{RegistryClient, RegistryConfig};
use std::path::PathBuf;
use std::time::Duration;
use storage::StatementStore;
use utils::AppError;

/// Command Line Interface for the Companies House accounts extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing bulk accounts ZIP archives
    #[arg(long)]
    archive_dir: Option<PathBuf>,

    /// Process a single company by fetching its latest full accounts
    #[arg(short, long)]
    company: Option<String>,

    /// SQLite database file for extracted statements
    #[arg(long, default_value = "./statements.db")]
    database: PathBuf,

    /// Companies House API key (falls back to the CH_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Registry API base URL
    #[arg(long, default_value = "https://api.company-information.service.gov.uk")]
    base_url: String,

    /// Delay between registry API calls, in milliseconds
    #[arg(long, default_value = "800")]
    pace_ms: u64,

    /// Per-request timeout for registry calls, in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    if args.archive_dir.is_none() && args.company.is_none() {
        return Err(AppError::Config(
            "Nothing to do: pass --archive-dir and/or --company".to_string(),
        ));
    }

    let api_key = args
        .api_key
        .or_else(|| std::env::var("CH_API_KEY").ok())
        .ok_or_else(|| {
            AppError::Config("Missing API key: pass --api-key or set CH_API_KEY".to_string())
        })?;

    // 3. Initialize the registry client and the statement store
    let mut config = RegistryConfig::new(api_key);
    config.base_url = args.base_url;
    config.pace = Duration::from_millis(args.pace_ms);
    config.timeout = Duration::from_secs(args.timeout_secs);
    let client = RegistryClient::new(config)?;
    let store = StatementStore::open(&args.database)?;
    let driver = CorpusDriver::new(&client, &store);

    // 4. Run the requested corpus
    let mut summary = CorpusSummary::default();

    if let Some(dir) = &args.archive_dir {
        tracing::info!("Processing archives from {}", dir.display());
        let archive_summary = driver.process_archive_dir(dir).await?;
        summary.processed += archive_summary.processed;
        summary.failed += archive_summary.failed;
        summary.skipped += archive_summary.skipped;
    }

    if let Some(company_number) = &args.company {
        tracing::info!("Processing latest accounts for company {}", company_number);
        let company_summary = driver.process_company(company_number).await;
        summary.processed += company_summary.processed;
        summary.failed += company_summary.failed;
        summary.skipped += company_summary.skipped;
    }

    tracing::info!(
        "Processing finished. Processed: {}, Failed: {}, Skipped: {}",
        summary.processed,
        summary.failed,
        summary.skipped
    );
    tracing::info!(
        "Store at {} now holds {} statements",
        args.database.display(),
        store.row_count()?
    );

    if summary.processed == 0 && summary.failed > 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract any statements from {} documents",
            summary.failed
        )));
    }

    Ok(())
}
