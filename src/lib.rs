pub mod cache;
pub mod cats;
pub mod config;
pub mod export;
pub mod fetch;
pub mod import;
pub mod model;
pub mod parse;
pub mod scrape;
pub mod store;
