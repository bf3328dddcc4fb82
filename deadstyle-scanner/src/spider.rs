//! Sequential traversal of selected pages through one isolated browsing context.

use crate::browser::{Browser, BrowsingContext, DEFAULT_USER_AGENT, Fetcher, HttpClient};
use crate::document::Document;
use crate::error::{Result, ScanError};
use crate::links::{LinkCollector, LinkSet};
use crate::result::{TraversalStats, UnusedReport};
use crate::styles::{StyleSourceCollector, StylesheetScope};
use crate::usage::find_unused;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Called once per newly discovered link.
pub type LinkCallback = Arc<dyn Fn(&str) + Send + Sync>;
/// Called before each page visit with the number of pages still queued.
pub type VisitCallback = Arc<dyn Fn(&str, usize) + Send + Sync>;
/// Called once per style source with at least one unused selector.
pub type UnusedCallback = Arc<dyn Fn(&str, &[String]) + Send + Sync>;
/// Called when the queue is drained.
pub type CompleteCallback = Arc<dyn Fn(&TraversalStats) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpiderState {
    Idle,
    Queued(usize),
    Visiting(String),
    Reporting(String),
    Done,
    /// The isolated context has been released.
    Disposed,
}

/// Settings for an HTTP-backed spider.
#[derive(Debug, Clone)]
pub struct SpiderOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub stylesheet_scope: StylesheetScope,
}

impl Default for SpiderOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            stylesheet_scope: StylesheetScope::SameSite,
        }
    }
}

impl SpiderOptions {
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_stylesheet_scope(mut self, scope: StylesheetScope) -> Self {
        self.stylesheet_scope = scope;
        self
    }
}

/// Accumulated findings of one traversal run.
#[derive(Default)]
struct Session {
    report: UnusedReport,
    stats: TraversalStats,
    unused_callback: Option<UnusedCallback>,
}

impl Session {
    fn record(&mut self, label: String, unused: Vec<String>) {
        if unused.is_empty() {
            return;
        }

        info!("{} unused selectors in {}", unused.len(), label);
        self.stats.sources_reported += 1;
        self.stats.selectors_unused += unused.len();
        if let Some(ref callback) = self.unused_callback {
            callback(&label, &unused);
        }
        self.report.insert(label, unused);
    }
}

pub struct Spider<B: Browser, F: Fetcher> {
    browser: B,
    fetcher: F,
    scope: StylesheetScope,
    page: Option<Document>,
    links: LinkSet,
    queue: Vec<Url>,
    context: Option<B::Context>,
    session: Session,
    state: SpiderState,
    link_callback: Option<LinkCallback>,
    visit_callback: Option<VisitCallback>,
    complete_callback: Option<CompleteCallback>,
}

impl Spider<HttpClient, HttpClient> {
    pub fn http(options: &SpiderOptions) -> Result<Self> {
        let client = HttpClient::build(options.timeout_secs, &options.user_agent)?;
        Ok(Spider::new(client.clone(), client).with_stylesheet_scope(options.stylesheet_scope))
    }
}

impl<B: Browser, F: Fetcher> Spider<B, F> {
    pub fn new(browser: B, fetcher: F) -> Self {
        Self {
            browser,
            fetcher,
            scope: StylesheetScope::default(),
            page: None,
            links: LinkSet::new(),
            queue: Vec::new(),
            context: None,
            session: Session::default(),
            state: SpiderState::Idle,
            link_callback: None,
            visit_callback: None,
            complete_callback: None,
        }
    }

    pub fn with_stylesheet_scope(mut self, scope: StylesheetScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_link_callback(mut self, callback: LinkCallback) -> Self {
        self.link_callback = Some(callback);
        self
    }

    pub fn with_visit_callback(mut self, callback: VisitCallback) -> Self {
        self.visit_callback = Some(callback);
        self
    }

    pub fn with_unused_callback(mut self, callback: UnusedCallback) -> Self {
        self.session.unused_callback = Some(callback);
        self
    }

    pub fn with_complete_callback(mut self, callback: CompleteCallback) -> Self {
        self.complete_callback = Some(callback);
        self
    }

    /// Loads the page at `initial_url` as the current page and discovers its links.
    ///
    /// Only discovers; nothing is visited until [`Spider::run`].
    pub async fn start(&mut self, initial_url: &str) -> Result<&[String]> {
        let url = Url::parse(initial_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", initial_url, e)))?;

        info!("Loading {}", url);
        // Relative links resolve against the address the page was served from
        let (final_url, body) = self.fetcher.fetch_page(&url).await?;
        Ok(self.start_with_page(Document::parse(final_url, &body)))
    }

    /// Like [`Spider::start`] for a page that is already loaded.
    pub fn start_with_page(&mut self, page: Document) -> &[String] {
        self.links.clear();
        self.add_link(page.url().to_string());

        for link in LinkCollector::new(page.url()).collect(&page) {
            self.add_link(link);
        }

        info!("Discovered {} links on {}", self.links.len(), page.url());
        self.page = Some(page);
        self.links.as_slice()
    }

    fn add_link(&mut self, url: String) {
        if self.links.insert(url.clone())
            && let Some(ref callback) = self.link_callback
        {
            callback(&url);
        }
    }

    pub fn discovered_links(&self) -> &[String] {
        self.links.as_slice()
    }

    pub fn state(&self) -> &SpiderState {
        &self.state
    }

    pub fn report(&self) -> &UnusedReport {
        &self.session.report
    }

    pub fn stats(&self) -> &TraversalStats {
        &self.session.stats
    }

    /// Visits every selected URL exactly once, one at a time, and returns the
    /// unused-selector report. A page that fails to load is skipped.
    pub async fn run<I, S>(&mut self, selected: I) -> &UnusedReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.session.report = UnusedReport::new();
        self.session.stats = TraversalStats::default();
        self.load_queue(selected);
        info!("Starting traversal of {} pages", self.queue.len());

        while let Some(url) = self.queue.pop() {
            self.state = SpiderState::Visiting(url.to_string());
            if let Some(ref callback) = self.visit_callback {
                callback(url.as_str(), self.queue.len());
            }

            match self.visit(&url).await {
                Ok(()) => self.session.stats.pages_visited += 1,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    self.session.stats.pages_failed += 1;
                }
            }
            self.state = SpiderState::Queued(self.queue.len());
        }

        self.state = SpiderState::Done;
        info!(
            "Traversal complete: {} pages, {} unused selectors",
            self.session.stats.pages_visited, self.session.stats.selectors_unused
        );
        if let Some(ref callback) = self.complete_callback {
            callback(&self.session.stats);
        }

        self.dispose();
        &self.session.report
    }

    fn load_queue<I, S>(&mut self, selected: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        self.queue.clear();

        for raw in selected {
            let raw = raw.as_ref();
            match Url::parse(raw) {
                Ok(url) => {
                    if seen.insert(url.to_string()) {
                        self.queue.push(url);
                    }
                }
                Err(e) => warn!("Ignoring invalid URL '{}': {}", raw, e),
            }
        }

        // Popped from the back, so reverse to visit in selection order
        self.queue.reverse();
        self.state = SpiderState::Queued(self.queue.len());
    }

    async fn visit(&mut self, url: &Url) -> Result<()> {
        if let Some(page) = self.page.as_ref().filter(|page| page.url() == url) {
            debug!("{} is the current page, analyzing it in place", url);
            self.state = SpiderState::Reporting(url.to_string());
            analyze(&self.style_collector(), &self.fetcher, &mut self.session, url, page).await;
            return Ok(());
        }

        let context = match self.context.take() {
            Some(context) => context,
            None => {
                debug!("Creating isolated browsing context");
                self.browser.open()?
            }
        };
        let context = self.context.insert(context);
        let document = context.load(url).await?;

        self.state = SpiderState::Reporting(url.to_string());
        analyze(&self.style_collector(), &self.fetcher, &mut self.session, url, &document).await;
        Ok(())
    }

    fn style_collector(&self) -> StyleSourceCollector {
        let collector = StyleSourceCollector::new(self.scope);
        match self.page {
            Some(ref page) => collector.with_site(page.url().clone()),
            None => collector,
        }
    }

    /// Releases the isolated context, if one was created.
    pub fn dispose(&mut self) {
        if let Some(context) = self.context.take() {
            debug!("Releasing isolated browsing context");
            context.release();
        }
        self.state = SpiderState::Disposed;
    }
}

/// Runs extraction and the usage check over every style source of `document`,
/// reporting each source as soon as it is available.
async fn analyze<F: Fetcher>(
    styles: &StyleSourceCollector,
    fetcher: &F,
    session: &mut Session,
    url: &Url,
    document: &Document,
) {
    styles
        .for_each_source(document, url.as_str(), fetcher, |source| {
            let summary = find_unused(source.selectors(), document);
            session.stats.selectors_checked += summary.checked;
            session.stats.selectors_unevaluable += summary.unevaluable;
            session.record(source.label, summary.unused);
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    type EventLog = Arc<Mutex<Vec<String>>>;

    /// In-memory site: URL -> HTML page or stylesheet text.
    #[derive(Clone)]
    struct FakeSite {
        pages: Arc<HashMap<String, String>>,
        events: EventLog,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: Arc::new(
                    pages
                        .iter()
                        .map(|(url, body)| (url.to_string(), body.to_string()))
                        .collect(),
                ),
                events: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn log(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn lookup(&self, url: &Url) -> Result<String> {
            self.pages.get(url.as_str()).cloned().ok_or_else(|| ScanError::Fetch {
                url: url.to_string(),
                reason: "not found".to_string(),
            })
        }
    }

    impl Fetcher for FakeSite {
        async fn fetch_text(&self, url: &Url) -> Result<String> {
            self.log(format!("fetch {}", url));
            self.lookup(url)
        }
    }

    struct FakeContext {
        site: FakeSite,
    }

    impl BrowsingContext for FakeContext {
        async fn load(&mut self, url: &Url) -> Result<Document> {
            self.site.log(format!("load {}", url));
            let body = self.site.lookup(url).map_err(|e| ScanError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            Ok(Document::parse(url.clone(), &body))
        }

        fn release(self) {
            self.site.log("release".to_string());
        }
    }

    impl Browser for FakeSite {
        type Context = FakeContext;

        fn open(&self) -> Result<FakeContext> {
            self.log("open".to_string());
            Ok(FakeContext { site: self.clone() })
        }
    }

    fn spider(site: &FakeSite) -> Spider<FakeSite, FakeSite> {
        Spider::new(site.clone(), site.clone())
    }

    #[tokio::test]
    async fn test_start_discovers_links_without_visiting() {
        let site = FakeSite::new(&[(
            "http://example.com/",
            r#"<a href="/a">a</a><a href="/b">b</a><a href="/a">dup</a><a href="mailto:x@y.z">m</a>"#,
        )]);
        let discovered = Arc::new(Mutex::new(Vec::new()));
        let discovered_clone = discovered.clone();

        let mut spider = spider(&site).with_link_callback(Arc::new(move |url: &str| {
            discovered_clone.lock().unwrap().push(url.to_string());
        }));
        let links = spider.start("http://example.com/").await.unwrap().to_vec();

        assert_eq!(
            links,
            vec![
                "http://example.com/",
                "http://example.com/a",
                "http://example.com/b"
            ]
        );
        assert_eq!(*discovered.lock().unwrap(), links);
        assert_eq!(site.events(), vec!["fetch http://example.com/"]);
        assert_eq!(spider.state(), &SpiderState::Idle);
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_url() {
        let site = FakeSite::new(&[]);
        let mut spider = spider(&site);
        assert!(matches!(
            spider.start("not a url").await,
            Err(ScanError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_visits_are_sequential_and_context_is_shared() {
        let site = FakeSite::new(&[
            ("http://example.com/", "<p>home</p>"),
            (
                "http://example.com/a",
                r#"<head><link rel="stylesheet" href="/a.css"></head><div class="a"></div>"#,
            ),
            ("http://example.com/a.css", ".a{x:1}.gone{y:2}"),
            (
                "http://example.com/b",
                r#"<head><link rel="stylesheet" href="/b.css"></head>"#,
            ),
            ("http://example.com/b.css", ".b{x:1}"),
            ("http://example.com/c", "<p>c</p>"),
        ]);

        let mut spider = spider(&site);
        spider.start("http://example.com/").await.unwrap();
        spider
            .run(["http://example.com/a", "http://example.com/b", "http://example.com/c"])
            .await;

        assert_eq!(
            site.events(),
            vec![
                "fetch http://example.com/",
                "open",
                "load http://example.com/a",
                "fetch http://example.com/a.css",
                "load http://example.com/b",
                "fetch http://example.com/b.css",
                "load http://example.com/c",
                "release",
            ]
        );
        assert_eq!(spider.state(), &SpiderState::Disposed);
        assert_eq!(spider.stats().pages_visited, 3);
    }

    #[tokio::test]
    async fn test_current_page_is_analyzed_in_place() {
        let site = FakeSite::new(&[(
            "http://example.com/",
            r#"<html><head><style>.used{color:red}
.unused{color:blue}</style></head><body><div class="used"></div></body></html>"#,
        )]);

        let mut spider = spider(&site);
        spider.start("http://example.com/").await.unwrap();
        let report = spider.run(["http://example.com/"]).await.clone();

        assert_eq!(
            report.get("inline styles (http://example.com/)").unwrap(),
            [".unused".to_string()]
        );
        // No isolated context is ever created for the current page
        assert!(!site.events().contains(&"open".to_string()));
    }

    #[tokio::test]
    async fn test_failed_page_does_not_abort_traversal() {
        let site = FakeSite::new(&[
            ("http://example.com/", "<p>home</p>"),
            (
                "http://example.com/ok",
                "<style>.nope{x:1}</style><p>ok</p>",
            ),
        ]);

        let completed = Arc::new(Mutex::new(None));
        let completed_clone = completed.clone();
        let mut spider =
            spider(&site).with_complete_callback(Arc::new(move |stats: &TraversalStats| {
                *completed_clone.lock().unwrap() = Some(stats.clone());
            }));
        spider.start("http://example.com/").await.unwrap();
        let report = spider
            .run(["http://example.com/missing", "http://example.com/ok", "::::"])
            .await;

        assert_eq!(report.labels(), vec!["inline styles (http://example.com/ok)"]);
        let stats = completed.lock().unwrap().clone().unwrap();
        assert_eq!(stats.pages_visited, 1);
        assert_eq!(stats.pages_failed, 1);
        assert!(site.events().ends_with(&["release".to_string()]));
    }

    #[tokio::test]
    async fn test_duplicate_selection_is_visited_once() {
        let site = FakeSite::new(&[("http://example.com/x", "<p>x</p>")]);

        let mut spider = spider(&site);
        spider
            .run(["http://example.com/x", "http://example.com/x"])
            .await;

        let loads = site
            .events()
            .iter()
            .filter(|event| event.starts_with("load"))
            .count();
        assert_eq!(loads, 1);
    }

    #[tokio::test]
    async fn test_unused_callback_fires_per_reported_source() {
        let site = FakeSite::new(&[
            ("http://example.com/", "<p>home</p>"),
            (
                "http://example.com/p",
                r#"<head><style>.i{x:1}</style><link rel="stylesheet" href="/s.css"><link rel="stylesheet" href="/used.css"></head><div class="u"></div>"#,
            ),
            ("http://example.com/s.css", ".s{x:1}\n.u{y:1}"),
            ("http://example.com/used.css", ".u{y:1}"),
        ]);

        let reported: Arc<Mutex<Vec<(String, Vec<String>)>>> = Arc::new(Mutex::new(Vec::new()));
        let reported_clone = reported.clone();
        let mut spider = spider(&site).with_unused_callback(Arc::new(
            move |label: &str, selectors: &[String]| {
                reported_clone
                    .lock()
                    .unwrap()
                    .push((label.to_string(), selectors.to_vec()));
            },
        ));
        spider.start("http://example.com/").await.unwrap();
        spider.run(["http://example.com/p"]).await;

        let reported = reported.lock().unwrap().clone();
        assert_eq!(
            reported,
            vec![
                (
                    "inline styles (http://example.com/p)".to_string(),
                    vec![".i".to_string()]
                ),
                ("http://example.com/s.css".to_string(), vec![".s".to_string()]),
            ]
        );
        assert_eq!(spider.stats().sources_reported, 2);
        assert_eq!(spider.stats().selectors_checked, 4);
    }

    /// Full HTTP path: two stylesheets, one of which fails.
    #[tokio::test]
    async fn test_http_traversal_with_failing_stylesheet() {
        let mock_server = MockServer::start().await;
        let root_html = format!(
            r#"<html><head></head><body>
                <a href="{}/page">Page</a>
                <a href="http://other.example.com/x">Other</a>
            </body></html>"#,
            mock_server.uri()
        );
        let page_html = r#"<html><head>
                <link rel="stylesheet" href="/ok.css">
                <link rel="stylesheet" href="/broken.css">
            </head><body><div class="used"></div></body></html>"#;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(page_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ok.css"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(".used{color:red}\n.unused{color:blue}"),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken.css"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let mut spider = Spider::http(&SpiderOptions::default().with_timeout(5)).unwrap();
        let root = format!("{}/", mock_server.uri());
        let links = spider.start(&root).await.unwrap().to_vec();
        assert_eq!(links, vec![root.clone(), format!("{}/page", mock_server.uri())]);

        let report = spider.run(&links).await;
        assert_eq!(report.len(), 1);
        assert_eq!(
            report.get(&format!("{}/ok.css", mock_server.uri())).unwrap(),
            [".unused".to_string()]
        );
    }

    #[tokio::test]
    async fn test_start_page_resolves_against_redirect_target() {
        let mock_server = MockServer::start().await;
        let docs_html = r#"<html><head>
                <link rel="stylesheet" href="site.css">
            </head><body>
                <a href="intro">Intro</a>
                <div class="used"></div>
            </body></html>"#;

        Mock::given(method("GET"))
            .and(path("/docs"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(docs_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/site.css"))
            .respond_with(ResponseTemplate::new(200).set_body_string(".used{x:1}.gone{y:2}"))
            .mount(&mock_server)
            .await;

        let mut spider = Spider::http(&SpiderOptions::default().with_timeout(5)).unwrap();
        let links = spider
            .start(&format!("{}/docs", mock_server.uri()))
            .await
            .unwrap()
            .to_vec();
        assert_eq!(
            links,
            vec![
                format!("{}/docs/", mock_server.uri()),
                format!("{}/docs/intro", mock_server.uri())
            ]
        );

        let report = spider.run(&links[..1]).await;
        assert_eq!(report.len(), 1);
        assert_eq!(
            report
                .get(&format!("{}/docs/site.css", mock_server.uri()))
                .unwrap(),
            [".gone".to_string()]
        );
    }
}
