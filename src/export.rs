use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::model::{Author, Quote};
use crate::scrape::ScrapeOutcome;

// Entry point
pub fn export_json(outcome: &ScrapeOutcome, quotes_path: &Path, authors_path: &Path) -> Result<()> {
    write_json(quotes_path, &outcome.quotes)?;
    info!(path = %quotes_path.display(), count = outcome.quotes.len(), "quotes saved");

    // Absent authors have no record to write.
    let authors: Vec<&Author> = outcome.authors.resolved().collect();
    write_json(authors_path, &authors)?;
    info!(path = %authors_path.display(), count = authors.len(), "authors saved");

    Ok(())
}

pub fn load_quotes(path: &Path) -> Result<Vec<Quote>> {
    read_json(path)
}

pub fn load_authors(path: &Path) -> Result<Vec<Author>> {
    read_json(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    let mut file =
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    file.write_all(json.as_bytes())?;

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    Ok(value)
}
