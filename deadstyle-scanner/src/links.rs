//! Discovery of same-site links worth spidering.

use crate::document::Document;
use scraper::Selector;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector is valid"));

/// Schemes that only make sense inside the browser or the local machine.
const LOCAL_PREFIXES: &[&str] = &[
    "file:",
    "chrome://",
    "chrome-extension://",
    "moz-extension://",
    "resource://",
    "about:",
];

/// Hrefs that never lead to another page.
const NON_NAVIGABLE_PREFIXES: &[&str] = &["javascript:", "#", "mailto:", "tel:"];

fn starts_with_any(href: &str, prefixes: &[&str]) -> bool {
    let lowered = href.to_ascii_lowercase();
    prefixes.iter().any(|prefix| lowered.starts_with(prefix))
}

/// True for file and browser-internal references we must never fetch.
pub fn is_local_reference(href: &str) -> bool {
    starts_with_any(href.trim(), LOCAL_PREFIXES)
}

/// True when both URLs share protocol and hostname. Ports are not compared.
pub fn is_same_site(url: &Url, site: &Url) -> bool {
    url.scheme() == site.scheme() && url.host_str() == site.host_str()
}

pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Collects navigable links that stay on the site being analyzed.
pub struct LinkCollector {
    site: Url,
}

impl LinkCollector {
    pub fn new(site: &Url) -> Self {
        Self { site: site.clone() }
    }

    /// Accepted links in document order, deduplicated, excluding the page itself.
    pub fn collect(&self, document: &Document) -> Vec<String> {
        let current = document.url().as_str();
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&ANCHORS) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(url) = self.accept(document, href) else {
                continue;
            };

            let url = url.to_string();
            if url == current {
                continue;
            }
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }

        debug!("Found {} candidate links on {}", links.len(), current);
        links
    }

    fn accept(&self, document: &Document, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty()
            || starts_with_any(href, NON_NAVIGABLE_PREFIXES)
            || starts_with_any(href, LOCAL_PREFIXES)
        {
            debug!("Skipping non-navigable link '{}'", href);
            return None;
        }

        let resolved = document.resolve(href)?;
        if !is_http(&resolved) {
            debug!("Skipping non-http link {}", resolved);
            return None;
        }

        // Relative links resolve onto the page's own site and pass trivially
        if !is_same_site(&resolved, &self.site) {
            debug!("Skipping cross-origin link {}", resolved);
            return None;
        }

        Some(resolved)
    }
}

/// Accumulated link list: insertion ordered, no duplicates.
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    links: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `url` unless already present. Returns whether it was new.
    pub fn insert(&mut self, url: String) -> bool {
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.links.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.links.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(page_url: &str, body: &str) -> Vec<String> {
        let url = Url::parse(page_url).unwrap();
        let document = Document::parse(url.clone(), body);
        LinkCollector::new(&url).collect(&document)
    }

    #[test]
    fn test_non_navigable_and_cross_origin_are_filtered() {
        let links = collect(
            "http://example.com/",
            r##"<a href="javascript:void(0)">js</a>
                <a href="#top">top</a>
                <a href="mailto:a@b.com">mail</a>
                <a href="http://other.example.com/x">other</a>"##,
        );
        assert!(links.is_empty(), "{links:?}");
    }

    #[test]
    fn test_relative_link_is_included() {
        let links = collect("http://example.com/", r#"<a href="/local">local</a>"#);
        assert_eq!(links, vec!["http://example.com/local"]);
    }

    #[test]
    fn test_local_and_internal_schemes_are_filtered() {
        let links = collect(
            "http://example.com/",
            r#"<a href="file:///etc/passwd">f</a>
               <a href="chrome://settings">c</a>
               <a href="">empty</a>
               <a href="   ">blank</a>"#,
        );
        assert!(links.is_empty(), "{links:?}");
    }

    #[test]
    fn test_same_site_absolute_links_ignore_port() {
        let links = collect(
            "http://example.com/",
            r#"<a href="http://example.com/a">a</a>
               <a href="http://example.com:8080/b">b</a>
               <a href="https://example.com/c">c</a>
               <a href="//cdn.example.net/d">d</a>"#,
        );
        assert_eq!(
            links,
            vec!["http://example.com/a", "http://example.com:8080/b"]
        );
    }

    #[test]
    fn test_current_page_and_duplicates_are_dropped() {
        let links = collect(
            "http://example.com/docs/",
            r#"<a href="/docs/">self</a>
               <a href="intro">intro</a>
               <a href="/docs/intro">intro again</a>
               <a href="http://example.com/docs/intro">and again</a>"#,
        );
        assert_eq!(links, vec!["http://example.com/docs/intro"]);
    }

    #[test]
    fn test_link_set_dedups() {
        let mut set = LinkSet::new();
        assert!(set.insert("http://example.com/".to_string()));
        assert!(!set.insert("http://example.com/".to_string()));
        assert!(set.insert("http://example.com/a".to_string()));

        assert_eq!(set.len(), 2);
        assert!(set.contains("http://example.com/a"));
        assert_eq!(set.as_slice()[0], "http://example.com/");
    }
}
