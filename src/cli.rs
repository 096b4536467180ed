// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   component-crawler crawl alice bob      crawl the given accounts
//   component-crawler refresh              crawl every account seen before
//   component-crawler list --account alice print what the catalog holds
//
// Credentials and endpoints come from the environment (see config.rs). The
// flags here only override the catalog location and the fetch concurrency.
// =============================================================================

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "component-crawler",
    version,
    about = "Collects component.json manifests from GitHub accounts into a catalog",
    long_about = "component-crawler searches every repository of a GitHub account, forks included, \
                  downloads the component.json manifest from each default branch and stores the \
                  results in a JSON catalog. Each crawl replaces the account's previous entries."
)]
pub struct Cli {
    /// Catalog file to read and update (overrides CATALOG_PATH)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl one or more accounts, one after another
    ///
    /// Example: component-crawler crawl alice bob --concurrency 10
    Crawl {
        /// GitHub account names
        #[arg(required = true)]
        accounts: Vec<String>,

        #[command(flatten)]
        options: CrawlOptions,
    },

    /// Crawl again every account already in the catalog
    Refresh {
        #[command(flatten)]
        options: CrawlOptions,
    },

    /// Print the components in the catalog
    List {
        /// Only show components of this account
        #[arg(long)]
        account: Option<String>,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Maximum simultaneous manifest fetches (overrides CONCURRENCY)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Also write every crawl log entry to this file as JSON lines
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
