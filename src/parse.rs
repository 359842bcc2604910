//! Field extraction for quote listing pages and author profile pages.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

use crate::model::{Author, Quote};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing element `{0}`")]
    MissingElement(&'static str),
    #[error("element `{0}` has no href")]
    MissingHref(&'static str),
    #[error("cannot resolve link `{href}`: {source}")]
    BadLink {
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid selector `{0}`")]
    Selector(&'static str),
}

/// A quote block together with the profile link of its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedQuote {
    pub quote: Quote,
    pub author_url: Url,
}

/// Everything extracted from one listing page.
///
/// Each quote block and the pagination control fail independently, so one
/// broken element never hides the rest of the page.
#[derive(Debug)]
pub struct ListingPage {
    pub quotes: Vec<Result<ListedQuote, ParseError>>,
    /// `Ok(None)` when the page has no "next" control.
    pub next_url: Result<Option<Url>, ParseError>,
}

struct QuoteSelectors {
    block: Selector,
    text: Selector,
    author: Selector,
    link: Selector,
    tag: Selector,
    next: Selector,
}

impl QuoteSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            block: selector("div.quote")?,
            text: selector("span.text")?,
            author: selector("small.author")?,
            link: selector("a")?,
            tag: selector("a.tag")?,
            next: selector("li.next")?,
        })
    }
}

/// Parses a listing page. Links are resolved against `base_url`.
pub fn parse_listing(html: &str, base_url: &Url) -> Result<ListingPage, ParseError> {
    let selectors = QuoteSelectors::new()?;
    let document = Html::parse_document(html);
    let root = document.root_element();

    let quotes = root
        .select(&selectors.block)
        .map(|block| parse_quote_block(block, &selectors, base_url))
        .collect();

    let next_url = parse_next_link(root, &selectors, base_url);

    Ok(ListingPage { quotes, next_url })
}

fn parse_quote_block(
    block: ElementRef<'_>,
    selectors: &QuoteSelectors,
    base_url: &Url,
) -> Result<ListedQuote, ParseError> {
    let text = first_text(block, &selectors.text, "span.text")?;
    let author_name = first_text(block, &selectors.author, "small.author")?;
    let href = first_href(block, &selectors.link, "a")?;
    let author_url = resolve(base_url, href)?;

    let tags = block
        .select(&selectors.tag)
        .map(|tag| tag.text().collect::<String>())
        .collect();

    Ok(ListedQuote {
        quote: Quote {
            tags,
            author_name,
            text,
        },
        author_url,
    })
}

fn parse_next_link(
    root: ElementRef<'_>,
    selectors: &QuoteSelectors,
    base_url: &Url,
) -> Result<Option<Url>, ParseError> {
    let Some(next) = root.select(&selectors.next).next() else {
        return Ok(None);
    };

    let href = first_href(next, &selectors.link, "li.next a")?;
    resolve(base_url, href).map(Some)
}

/// Parses an author profile page. All four fields are required.
pub fn parse_author(html: &str) -> Result<Author, ParseError> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let field = |css: &'static str| -> Result<String, ParseError> {
        let sel = selector(css)?;
        first_text(root, &sel, css).map(|text| text.trim().to_string())
    };

    Ok(Author {
        full_name: field("h3.author-title")?,
        born_date: field("span.author-born-date")?,
        born_location: field("span.author-born-location")?,
        description: field("div.author-description")?,
    })
}

fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css))
}

fn first_text(
    scope: ElementRef<'_>,
    selector: &Selector,
    css: &'static str,
) -> Result<String, ParseError> {
    scope
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .ok_or(ParseError::MissingElement(css))
}

fn first_href<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    css: &'static str,
) -> Result<&'a str, ParseError> {
    scope
        .select(selector)
        .next()
        .ok_or(ParseError::MissingElement(css))?
        .value()
        .attr("href")
        .ok_or(ParseError::MissingHref(css))
}

fn resolve(base_url: &Url, href: &str) -> Result<Url, ParseError> {
    base_url.join(href).map_err(|source| ParseError::BadLink {
        href: href.to_string(),
        source,
    })
}
