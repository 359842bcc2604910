use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Retrieves the HTML behind a URL.
///
/// Every call runs to completion before the scraper issues the next one, so
/// implementations need not be `Send`.
#[async_trait(?Send)]
pub trait Fetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

#[async_trait(?Send)]
impl<'a, T: Fetcher + ?Sized> Fetcher for &'a T {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

/// Plain GET over reqwest, no retries.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// `None` keeps reqwest's default, which never times out.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait(?Send)]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source: Box::new(source),
        };

        let response = self.client.get(url.clone()).send().await.map_err(transport)?;

        // The body is used whatever the status says.
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "non-success status, parsing body anyway");
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await.map_err(transport)?;

        debug!(%url, bytes = bytes.len(), "fetched");

        Ok(decode_body(content_type.as_deref(), &bytes))
    }
}

/// Decodes a response body to text.
///
/// Tries the Content-Type charset, then a `charset=` declaration in the
/// first 4 KiB of the document, then falls back to statistical detection.
pub fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> String {
    // 1. Try charset from header
    if let Some(encoding) = content_type.and_then(header_charset) {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }

    // 2. Try to detect charset from meta tag (ASCII-safe)
    let ascii_head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]);
    if let Some(encoding) = meta_charset(&ascii_head) {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }

    // 3. Fallback: Detect encoding automatically
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn header_charset(content_type: &str) -> Option<&'static Encoding> {
    let content_type = content_type.to_ascii_lowercase();
    let charset = content_type.split("charset=").nth(1)?;
    let label = charset.split(';').next()?.trim().trim_matches('"');
    Encoding::for_label(label.as_bytes())
}

fn meta_charset(head: &str) -> Option<&'static Encoding> {
    let re = Regex::new(r#"charset\s*=\s*["']?([A-Za-z0-9_\-]+)"#).ok()?;
    let charset = re.captures(head)?.get(1)?.as_str();
    Encoding::for_label(charset.as_bytes())
}
