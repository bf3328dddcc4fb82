//! Collaborators the spider drives: a network fetcher for stylesheet text and a
//! browser that hands out isolated, disposable contexts for loading pages.

use crate::document::Document;
use crate::error::{Result, ScanError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = concat!("deadstyle/", env!("CARGO_PKG_VERSION"));

/// Retrieves resource text over the network.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String>;

    /// Fetches a page and returns it with the URL it was finally served from.
    /// Fetchers that follow redirects must override this.
    async fn fetch_page(&self, url: &Url) -> Result<(Url, String)> {
        Ok((url.clone(), self.fetch_text(url).await?))
    }
}

/// An isolated environment that loads one URL at a time and exposes the
/// resulting document.
#[allow(async_fn_in_trait)]
pub trait BrowsingContext {
    async fn load(&mut self, url: &Url) -> Result<Document>;

    /// Tear the context down. Called once, when a traversal run finishes.
    fn release(self);
}

/// Factory for isolated browsing contexts.
pub trait Browser {
    type Context: BrowsingContext;

    fn open(&self) -> Result<Self::Context>;
}

/// reqwest-backed fetcher and browser sharing one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::build(10, DEFAULT_USER_AGENT)
    }

    pub fn build(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        Ok(response)
    }
}

impl Fetcher for HttpClient {
    async fn fetch_text(&self, url: &Url) -> Result<String> {
        Ok(self.get(url).await?.text().await?)
    }

    async fn fetch_page(&self, url: &Url) -> Result<(Url, String)> {
        let response = self.get(url).await?;
        let final_url = response.url().clone();
        if final_url != *url {
            debug!("{} redirected to {}", url, final_url);
        }
        Ok((final_url, response.text().await?))
    }
}

impl Browser for HttpClient {
    type Context = HttpContext;

    fn open(&self) -> Result<HttpContext> {
        Ok(HttpContext {
            client: self.client.clone(),
            loads: 0,
        })
    }
}

/// A browsing context that loads pages with plain GET requests.
pub struct HttpContext {
    client: Client,
    loads: usize,
}

impl BrowsingContext for HttpContext {
    async fn load(&mut self, url: &Url) -> Result<Document> {
        self.loads += 1;
        debug!("Loading {} in isolated context", url);

        let navigation_error = |reason: String| ScanError::Navigation {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(navigation_error(format!("HTTP {}", status.as_u16())));
        }

        if let Some(content_type) = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            && !content_type.contains("html")
        {
            return Err(ScanError::NotHtml {
                url: url.to_string(),
                content_type: content_type.to_string(),
            });
        }

        // Resolve relative references against where we ended up after redirects
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        Ok(Document::parse(final_url, &body))
    }

    fn release(self) {
        debug!("Released isolated context after {} loads", self.loads);
    }
}
