pub mod browser;
pub mod document;
pub mod error;
pub mod extract;
pub mod links;
pub mod result;
pub mod spider;
pub mod styles;
pub mod usage;

pub use browser::{Browser, BrowsingContext, Fetcher, HttpClient};
pub use document::Document;
pub use error::ScanError;
pub use extract::extract_selectors;
pub use links::{LinkCollector, LinkSet};
pub use result::{StyleSource, TraversalStats, UnusedReport};
pub use spider::{
    CompleteCallback, LinkCallback, Spider, SpiderOptions, SpiderState, UnusedCallback,
    VisitCallback,
};
pub use styles::{StyleSourceCollector, StylesheetScope};
pub use usage::{Usage, check_usage, find_unused, is_unused};
