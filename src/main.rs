// src/main.rs
// =============================================================================
// Entry point of the component-crawler CLI.
//
// What happens here:
// 1. Set up tracing (RUST_LOG, default component_crawler=info)
// 2. Parse command-line arguments using clap
// 3. Open the catalog and run the requested command
// 4. Exit with proper code (0 = all crawls completed, 1 = a crawl ended
//    early, 2 = error before or outside the crawl)
// =============================================================================

mod cli;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CrawlOptions};
use component_crawler::catalog::{Catalog, ManifestRecord};
use component_crawler::config::Config;
use component_crawler::crawl::Crawler;
use component_crawler::log::{LogSink, MemorySink, TeeSink, TracingSink};

// #[tokio::main] starts the multi-threaded runtime and runs main() on it
#[tokio::main]
async fn main() {
    // RUST_LOG wins when set, e.g. RUST_LOG=component_crawler=debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("component_crawler=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Errors that escape run() are setup problems (config, catalog file),
    // not crawl failures
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Runs the requested command and returns the process exit code
async fn run() -> Result<i32> {
    // Parse command-line arguments (clap prints help/errors and exits itself)
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl { accounts, options } => {
            let config = load_config(cli.catalog, &options)?;
            let catalog = open_catalog(&config.catalog_path).await?;
            crawl_accounts(&config, catalog, &accounts, &options).await
        }
        Commands::Refresh { options } => {
            let config = load_config(cli.catalog, &options)?;
            let catalog = open_catalog(&config.catalog_path).await?;
            let accounts = catalog.known_accounts();
            if accounts.is_empty() {
                println!("No accounts in the catalog yet; use `crawl` first");
                return Ok(0);
            }
            crawl_accounts(&config, catalog, &accounts, &options).await
        }
        Commands::List { account, json } => {
            // list never talks to GitHub, so it needs no credentials
            let path = cli.catalog.unwrap_or_else(Config::catalog_path_from_env);
            let catalog = open_catalog(&path).await?;
            let records = match account {
                Some(account) => catalog.records_for(&account),
                None => catalog.records(),
            };
            print_records(&records, json)?;
            Ok(0)
        }
    }
}

// Reads the environment, then applies command-line overrides
fn load_config(catalog: Option<std::path::PathBuf>, options: &CrawlOptions) -> Result<Config> {
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(path) = catalog {
        config.catalog_path = path;
    }
    // --concurrency 0 is ignored, like CONCURRENCY=0
    if let Some(concurrency) = options.concurrency.filter(|n| *n > 0) {
        config.concurrency = concurrency;
    }
    Ok(config)
}

async fn open_catalog(path: &Path) -> Result<Arc<Catalog>> {
    let catalog = Catalog::open(path)
        .await
        .with_context(|| format!("cannot open catalog {}", path.display()))?;
    Ok(Arc::new(catalog))
}

/// Crawls accounts one at a time. A failed crawl is reported and the rest
/// still run; the exit code records that something failed.
async fn crawl_accounts(
    config: &Config,
    catalog: Arc<Catalog>,
    accounts: &[String],
    options: &CrawlOptions,
) -> Result<i32> {
    let (sink, memory) = crawl_log(options.log_file.is_some());
    let crawler = Crawler::from_config(config, catalog, sink)?;

    // Accounts run in sequence; a failure moves on to the next one
    let mut failed = 0;
    for account in accounts {
        match crawler.crawl_account(account).await {
            Ok(report) => println!(
                "✅ {}: {} component(s) from {} repositories in {:.1}s",
                report.account,
                report.records,
                report.repositories_seen,
                report.elapsed.as_secs_f64()
            ),
            Err(e) => {
                failed += 1;
                println!("❌ {}: {}", account, e);
            }
        }
    }

    // Both are Some exactly when --log-file was given
    if let (Some(path), Some(memory)) = (&options.log_file, &memory) {
        write_log_file(path, memory)?;
    }

    Ok(if failed > 0 { 1 } else { 0 })
}

// Chooses where crawl log entries go
//
// Always to tracing. Only when a log file was requested are they also kept
// in memory, to be written out once all crawls are done.
fn crawl_log(keep_entries: bool) -> (Arc<dyn LogSink>, Option<Arc<MemorySink>>) {
    if !keep_entries {
        return (Arc::new(TracingSink), None);
    }
    let memory = Arc::new(MemorySink::new());
    let sink: Arc<dyn LogSink> = Arc::new(TeeSink(TracingSink, Arc::clone(&memory)));
    (sink, Some(memory))
}

// Writes the collected entries as JSON lines, one object per line
fn write_log_file(path: &Path, memory: &MemorySink) -> Result<()> {
    let mut out = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    for entry in memory.entries() {
        serde_json::to_writer(&mut out, &entry)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

// Prints records as a fixed-width table, or as pretty JSON with --json
fn print_records(records: &[ManifestRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    println!("{:<40} {:<30} {:<10}", "REPO", "NAME", "VERSION");
    println!("{}", "=".repeat(80));
    for record in records {
        let field = |key: &str| {
            record
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string()
        };
        println!(
            "{:<40} {:<30} {:<10}",
            record.repo().unwrap_or("-"),
            field("name"),
            field("version")
        );
    }
    println!();
    println!("📋 Total: {}", records.len());
    Ok(())
}
