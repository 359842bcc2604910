use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://quotes.toscrape.com";
pub const DEFAULT_DATABASE: &str = "scraped.db";

/// Environment variable naming the document store location.
pub const STORE_ENV: &str = "MONGO_URI";
/// Consulted only when `MONGO_URI` is unset or blank.
pub const DATABASE_ENV: &str = "DATABASE_URL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: Url,
    pub quotes_path: PathBuf,
    pub authors_path: PathBuf,
    pub database: PathBuf,
    /// Unset means no timeout.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            quotes_path: PathBuf::from("quotes.json"),
            authors_path: PathBuf::from("authors.json"),
            database: PathBuf::from(DEFAULT_DATABASE),
            request_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Applies `MONGO_URI` (or `DATABASE_URL`) if set. Returns true when the
    /// environment supplied the store location.
    pub fn apply_env(&mut self) -> bool {
        match env_database() {
            Some(path) => {
                self.database = path;
                true
            }
            None => false,
        }
    }
}

/// Store location from `MONGO_URI`, falling back to `DATABASE_URL`.
pub fn env_database() -> Option<PathBuf> {
    database_path(std::env::var(STORE_ENV).ok(), std::env::var(DATABASE_ENV).ok())
}

fn database_path(store_uri: Option<String>, database_url: Option<String>) -> Option<PathBuf> {
    let value = [store_uri, database_url]
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())?;
    Some(PathBuf::from(value.trim_start_matches("sqlite://")))
}

/// Reads a JSON config file; missing keys take their defaults.
pub fn load(path: &Path) -> Result<Config> {
    let text =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn parse(text: &str) -> Result<Config> {
    let config: Config = serde_json::from_str(text)?;
    Ok(config)
}
