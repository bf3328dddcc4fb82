//! Enumerates a page's style sources: `<style>` blocks and linked stylesheets.

use crate::browser::Fetcher;
use crate::document::Document;
use crate::links::{is_http, is_local_reference, is_same_site};
use crate::result::StyleSource;
use futures::stream::{FuturesUnordered, StreamExt};
use scraper::Selector;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

static STYLE_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("style").expect("static selector is valid"));
static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel][href]").expect("static selector is valid"));

/// Which linked stylesheets get fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StylesheetScope {
    /// Only stylesheets on the analyzed site (protocol + hostname).
    #[default]
    SameSite,
    /// Any http(s) stylesheet, CDNs included.
    Any,
}

pub struct StyleSourceCollector {
    scope: StylesheetScope,
    site: Option<Url>,
}

impl StyleSourceCollector {
    pub fn new(scope: StylesheetScope) -> Self {
        Self { scope, site: None }
    }

    /// Site used for [`StylesheetScope::SameSite`]. Defaults to each document's own URL.
    pub fn with_site(mut self, site: Url) -> Self {
        self.site = Some(site);
        self
    }

    /// All `<style>` blocks of the page as one source, if there are any.
    pub fn inline_source(document: &Document, page_url: &str) -> Option<StyleSource> {
        let blocks: Vec<String> = document
            .select(&STYLE_BLOCKS)
            .map(|style| style.text().collect::<String>())
            .collect();

        if blocks.is_empty() {
            None
        } else {
            Some(StyleSource::inline(page_url, blocks))
        }
    }

    /// Resolved URLs of the linked stylesheets this collector would fetch.
    pub fn stylesheet_urls(&self, document: &Document) -> Vec<Url> {
        let site = self.site.as_ref().unwrap_or(document.url());
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for link in document.select(&LINKS) {
            let element = link.value();
            let is_stylesheet = element.attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            });
            let Some(href) = element.attr("href").map(str::trim) else {
                continue;
            };
            if !is_stylesheet || href.is_empty() || is_local_reference(href) {
                continue;
            }

            let Some(url) = document.resolve(href) else {
                debug!("Skipping unresolvable stylesheet '{}'", href);
                continue;
            };
            if !is_http(&url) {
                continue;
            }
            if self.scope == StylesheetScope::SameSite && !is_same_site(&url, site) {
                debug!("Skipping off-site stylesheet {}", url);
                continue;
            }

            if seen.insert(url.to_string()) {
                urls.push(url);
            }
        }

        urls
    }

    /// Feeds every style source of `document` to `on_source`: the inline source
    /// first, then each linked stylesheet as its fetch completes.
    ///
    /// Fetches for one page run concurrently and all settle before this returns.
    /// Failed or empty fetches produce no source.
    pub async fn for_each_source<F, S>(
        &self,
        document: &Document,
        page_url: &str,
        fetcher: &F,
        mut on_source: S,
    ) where
        F: Fetcher,
        S: FnMut(StyleSource),
    {
        if let Some(inline) = Self::inline_source(document, page_url) {
            on_source(inline);
        }

        let mut pending: FuturesUnordered<_> = self
            .stylesheet_urls(document)
            .into_iter()
            .map(|url| async move {
                let fetched = fetcher.fetch_text(&url).await;
                (url, fetched)
            })
            .collect();

        while let Some((url, fetched)) = pending.next().await {
            match fetched {
                Ok(css) if css.trim().is_empty() => {
                    debug!("Stylesheet {} is empty", url);
                }
                Ok(css) => on_source(StyleSource::linked(url.to_string(), css)),
                Err(e) => warn!("Skipping stylesheet {}: {}", url, e),
            }
        }
    }

    pub async fn collect<F: Fetcher>(
        &self,
        document: &Document,
        page_url: &str,
        fetcher: &F,
    ) -> Vec<StyleSource> {
        let mut sources = Vec::new();
        self.for_each_source(document, page_url, fetcher, |source| sources.push(source))
            .await;
        sources
    }
}
