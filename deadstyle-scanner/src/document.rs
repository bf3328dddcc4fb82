//! Parsed HTML documents and the selector query capability used by the usage check.

use crate::error::{Result, ScanError};
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

static BASE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("static selector is valid"));

/// A loaded page: its URL and the parsed element tree.
pub struct Document {
    url: Url,
    html: Html,
}

impl Document {
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            html: Html::parse_document(body),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The URL relative references resolve against, honouring `<base href>`.
    pub fn base_url(&self) -> Url {
        self.html
            .select(&BASE)
            .next()
            .and_then(|base| base.value().attr("href"))
            .and_then(|href| self.url.join(href.trim()).ok())
            .unwrap_or_else(|| self.url.clone())
    }

    pub fn resolve(&self, href: &str) -> Option<Url> {
        self.base_url().join(href).ok()
    }

    /// Elements matching `selector`, in document order.
    ///
    /// Fails with [`ScanError::SelectorSyntax`] when the selector engine can't
    /// parse the string (bad syntax, pseudo-elements, empty input).
    pub fn query(&self, selector: &str) -> Result<Vec<ElementRef<'_>>> {
        let parsed = Selector::parse(selector).map_err(|e| ScanError::SelectorSyntax {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;

        Ok(self.html.select(&parsed).collect())
    }

    /// Elements matching a selector known to be valid.
    pub(crate) fn select<'a>(
        &'a self,
        selector: &'a Selector,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(selector)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document").field("url", &self.url.as_str()).finish()
    }
}
