use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::model::{Author, Quote};
use crate::store::{Document, DocumentStore, StoreError, to_document};

pub const QUOTES_COLLECTION: &str = "quotes";
pub const AUTHORS_COLLECTION: &str = "authors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub quotes: usize,
    pub authors: usize,
}

/// Replaces the `quotes` and `authors` collections with the given records.
///
/// Each collection is cleared before it is filled, so importing the same
/// data twice leaves the store unchanged.
pub fn import_scraped<'a, A>(
    store: &DocumentStore,
    quotes: &[Quote],
    authors: A,
) -> Result<ImportReport, StoreError>
where
    A: IntoIterator<Item = &'a Author>,
{
    store.ping()?;

    let quotes = replace_collection(store, QUOTES_COLLECTION, quotes)?;
    info!(count = quotes, "quotes imported");

    let authors: Vec<&Author> = authors.into_iter().collect();
    let authors = replace_collection(store, AUTHORS_COLLECTION, &authors)?;
    info!(count = authors, "authors imported");

    Ok(ImportReport { quotes, authors })
}

/// Opens the store at `database` and imports into it.
///
/// Failures are logged and reported as `None`; they never abort the run.
pub fn import_into(database: &Path, quotes: &[Quote], authors: &[Author]) -> Option<ImportReport> {
    let result = DocumentStore::open(database)
        .and_then(|store| import_scraped(&store, quotes, authors));

    match result {
        Ok(report) => {
            info!(quotes = report.quotes, authors = report.authors, "import finished");
            Some(report)
        }
        Err(e) => {
            error!(database = %database.display(), error = %e, "import failed");
            None
        }
    }
}

fn replace_collection<T: Serialize>(
    store: &DocumentStore,
    name: &str,
    items: &[T],
) -> Result<usize, StoreError> {
    let docs = items
        .iter()
        .map(to_document)
        .collect::<Result<Vec<_>, _>>()?;

    let collection = store.collection(name);
    let cleared = collection.delete_many(&Document::new())?;
    if cleared > 0 {
        info!(collection = name, cleared, "cleared previous import");
    }

    Ok(collection.insert_many(docs)?.len())
}
