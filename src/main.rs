use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use url::Url;

use quotes_scraper::config::{self, Config};
use quotes_scraper::export;
use quotes_scraper::fetch::HttpFetcher;
use quotes_scraper::import;
use quotes_scraper::model::Author;
use quotes_scraper::scrape::Scraper;

#[derive(Parser, Debug)]
#[command(name = "quotes_scraper")]
#[command(about = "Scrape quotes and author biographies, save them as JSON and load them into the store")]
struct Args {
    /// JSON config file; every key is optional
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listing page to start from
    #[arg(long)]
    base_url: Option<Url>,

    /// Only write the JSON files
    #[arg(long, conflicts_with = "import_only")]
    skip_import: bool,

    /// Load the previously written JSON files into the store without scraping
    #[arg(long)]
    import_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    let database_from_env = config.apply_env();

    info!("Scraper started");

    let (quotes, authors) = if args.import_only {
        (
            export::load_quotes(&config.quotes_path)?,
            export::load_authors(&config.authors_path)?,
        )
    } else {
        let fetcher = HttpFetcher::new(config.request_timeout())?;
        let outcome = Scraper::new(fetcher, config.base_url.clone()).run().await;

        if let Err(e) = export::export_json(&outcome, &config.quotes_path, &config.authors_path) {
            error!(error = %e, "saving JSON failed");
        }

        let authors: Vec<Author> = outcome.authors.resolved().cloned().collect();
        (outcome.quotes, authors)
    };

    if args.skip_import {
        info!("Scraper finished");
        return Ok(());
    }

    if database_from_env {
        info!(database = %config.database.display(), "using store from {}", config::STORE_ENV);
    } else {
        info!(database = %config.database.display(), "using default local store");
    }

    import::import_into(&config.database, &quotes, &authors);

    info!("Scraper finished");

    Ok(())
}
