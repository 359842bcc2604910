use std::collections::HashSet;

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::cache::AuthorCache;
use crate::fetch::{FetchError, Fetcher};
use crate::model::{Author, Quote};
use crate::parse::{self, ListedQuote, ParseError};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("fetching listing page {url} failed")]
    Fetch {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("parsing listing page {url} failed")]
    Parse {
        url: Url,
        #[source]
        source: ParseError,
    },
}

/// Everything gathered by one run, including partial results of an
/// interrupted one.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub quotes: Vec<Quote>,
    pub authors: AuthorCache,
    /// Listing pages fetched and parsed.
    pub pages: usize,
    /// The error that stopped pagination early, if any.
    pub interrupted: Option<ScrapeError>,
}

/// Walks the listing pages from `base_url` through their "next" links and
/// resolves every distinct author once.
pub struct Scraper<F> {
    fetcher: F,
    base_url: Url,
    quotes: Vec<Quote>,
    authors: AuthorCache,
    visited: HashSet<Url>,
    pages: usize,
}

impl<F: Fetcher> Scraper<F> {
    pub fn new(fetcher: F, base_url: Url) -> Self {
        Self {
            fetcher,
            base_url,
            quotes: Vec::new(),
            authors: AuthorCache::new(),
            visited: HashSet::new(),
            pages: 0,
        }
    }

    pub async fn run(mut self) -> ScrapeOutcome {
        let interrupted = self.paginate().await.err();

        if let Some(e) = &interrupted {
            warn!(error = %e, pages = self.pages, "scrape interrupted, keeping partial results");
        }

        info!(
            pages = self.pages,
            quotes = self.quotes.len(),
            authors = self.authors.len(),
            "scrape finished"
        );

        ScrapeOutcome {
            quotes: self.quotes,
            authors: self.authors,
            pages: self.pages,
            interrupted,
        }
    }

    async fn paginate(&mut self) -> Result<(), ScrapeError> {
        let mut cursor = Some(self.base_url.clone());

        while let Some(url) = cursor {
            if !self.visited.insert(url.clone()) {
                warn!(%url, "listing page already visited, stopping");
                break;
            }

            info!(%url, "scraping listing page");

            let html = self
                .fetcher
                .fetch(&url)
                .await
                .map_err(|source| ScrapeError::Fetch {
                    url: url.clone(),
                    source,
                })?;

            let page = parse::parse_listing(&html, &self.base_url).map_err(|source| {
                ScrapeError::Parse {
                    url: url.clone(),
                    source,
                }
            })?;
            self.pages += 1;

            for entry in page.quotes {
                match entry {
                    Ok(listed) => self.accept(listed).await,
                    Err(e) => warn!(%url, error = %e, "skipping malformed quote block"),
                }
            }

            cursor = page
                .next_url
                .map_err(|source| ScrapeError::Parse { url, source })?;
        }

        Ok(())
    }

    async fn accept(&mut self, listed: ListedQuote) {
        let ListedQuote { quote, author_url } = listed;

        if !self.authors.contains(&quote.author_name) {
            let author = self.resolve_author(&quote.author_name, &author_url).await;
            self.authors.insert(quote.author_name.clone(), author);
        }

        self.quotes.push(quote);
    }

    async fn resolve_author(&self, name: &str, url: &Url) -> Option<Author> {
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(author = name, %url, error = %e, "author page fetch failed, recording as absent");
                return None;
            }
        };

        match parse::parse_author(&html) {
            Ok(author) => {
                // Flagged only: the listing name stays the cache key.
                if author.full_name != name {
                    warn!(
                        listed_as = name,
                        full_name = %author.full_name,
                        "author profile name differs from listing"
                    );
                }
                Some(author)
            }
            Err(e) => {
                warn!(author = name, %url, error = %e, "author page unparseable, recording as absent");
                None
            }
        }
    }
}
