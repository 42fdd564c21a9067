// src/main.rs
mod analysis;
mod cli;
mod config;
mod edgar;
mod extractors;
mod pipeline;
mod storage;
mod utils;

use analysis::{OpenAiService, Summarizer};
use clap::Parser;
use config::{CliOverrides, Settings};
use edgar::EdgarClient;
use pipeline::Pipeline;
use std::path::PathBuf;
use storage::StorageManager;
use utils::AppError;

/// Compare the Item 1A risk factors of two 10-K filings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ticker symbol of the company (prompted for when omitted)
    #[arg(short, long)]
    ticker: Option<String>,

    /// Directory for downloaded filings and results (default: $DATA_DIR or ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Number of recent 10-K filings offered for selection
    #[arg(long)]
    max_filings: Option<usize>,

    /// Minimum Item 1A section size in characters (default: 1000)
    #[arg(long)]
    min_section_size: Option<usize>,

    /// Minimum words per risk factor (default: 50)
    #[arg(long)]
    min_words: Option<usize>,

    /// Debug mode - save annotated HTML and failure notes next to each filing
    #[arg(short, long)]
    debug: bool,

    /// Log filter used when RUST_LOG is not set (e.g. "debug")
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Environment and CLI arguments
    dotenv::dotenv().ok();
    let args = Args::parse();

    // 2. Setup Logging (RUST_LOG, then --log-level)
    utils::logging::setup_logging(args.log_level.as_deref());
    tracing::info!("Starting with args: {:?}", args);

    let settings = Settings::load(CliOverrides {
        data_dir: args.data_dir.clone(),
        max_filings: args.max_filings,
        min_section_size: args.min_section_size,
        min_words: args.min_words,
        debug: args.debug,
    })?;
    tracing::debug!("Settings: {:?}", settings.extraction);

    // 3. Collaborators
    let storage = StorageManager::new(&settings.data_dir)?;
    let client = EdgarClient::new(&settings.edgar)?;
    let summarizer = match OpenAiService::new(&settings.openai) {
        Ok(service) => Some(Summarizer::new(service, settings.openai.max_input_chars)),
        Err(e) => {
            tracing::warn!("Narrative analysis disabled: {}", e);
            None
        }
    };
    let pipeline = Pipeline::new(&settings, client, storage, summarizer);

    // 4. Ticker and filings
    let ticker = match args.ticker {
        Some(ticker) if !ticker.trim().is_empty() => ticker.trim().to_uppercase(),
        Some(_) => return Err(AppError::Config("--ticker must not be empty".to_string())),
        None => cli::prompt_ticker()?,
    };
    println!("\n=== Risk Analysis: {} ===", ticker);

    let filings = pipeline.discover_filings(&ticker).await?;
    if let Some(first) = filings.first() {
        println!("Company: {} (CIK {})", first.company_name, first.cik);
    }

    // 5. Compare the selected pair
    let (first, second) = cli::prompt_filing_pair(&filings)?;
    println!(
        "\nAnalyzing risk factors between {} and {}...",
        filings[first].filing_date, filings[second].filing_date
    );
    let report = pipeline.compare(&filings[first], &filings[second]).await?;

    cli::print_report(&report);
    tracing::info!("Analysis complete for {}", ticker);
    Ok(())
}
