use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use quotes_scraper::cats::{self, CATS_COLLECTION, Cat};
use quotes_scraper::config;
use quotes_scraper::store::{Collection, Document, DocumentStore, StoreError};

const DEFAULT_DATABASE: &str = "cats.db";

#[derive(Parser, Debug)]
#[command(name = "cats")]
#[command(about = "CRUD walkthrough over the cats collection")]
struct Args {
    /// Store file; falls back to MONGO_URI, then DATABASE_URL, then cats.db
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Delete every cat at the end
    #[arg(long)]
    purge: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let database = args
        .database
        .or_else(config::env_database)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

    let store = match DocumentStore::open(&database).and_then(|store| {
        store.ping()?;
        Ok(store)
    }) {
        Ok(store) => store,
        Err(e) => {
            error!(database = %database.display(), error = %e, "cannot open store");
            return Ok(());
        }
    };

    let collection = store.collection(CATS_COLLECTION);
    run_demo(&collection, args.purge);

    Ok(())
}

fn run_demo(collection: &Collection<'_>, purge: bool) {
    let existing = report("check for data", collection.find_one(&Document::new()));
    if matches!(existing, Some(None)) {
        info!("collection is empty, adding sample cats");
        for cat in [
            Cat::new("barsik", 3, &["wears slippers", "lets you pet him", "ginger"]),
            Cat::new("lapa", 5, &["loves to sleep", "not afraid of dogs"]),
            Cat::new("marta", 2, &["playful", "loves milk"]),
        ] {
            report("create", cats::create_cat(collection, &cat));
        }
    }

    report("read all", cats::read_all_cats(collection));
    report("read", cats::read_cat_by_name(collection, "barsik"));
    report("read", cats::read_cat_by_name(collection, "non_existent_cat"));

    report("update age", cats::update_cat_age_by_name(collection, "barsik", 4));
    report("add feature", cats::add_cat_feature_by_name(collection, "lapa", "hates water"));
    report("read all", cats::read_all_cats(collection));

    report("delete", cats::delete_cat_by_name(collection, "marta"));
    report("read all", cats::read_all_cats(collection));

    if purge {
        report("delete all", cats::delete_all_cats(collection));
        report("read all", cats::read_all_cats(collection));
    }
}

/// Logs a failed step; the walkthrough carries on either way.
fn report<T>(step: &str, result: Result<T, StoreError>) -> Option<T> {
    result.map_err(|e| error!(step, error = %e, "cats step failed")).ok()
}
