use deadstyle_scanner::error::Result;
use deadstyle_scanner::{Spider, SpiderOptions, TraversalStats, UnusedCallback, UnusedReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Which discovered links get analyzed
pub enum Selection {
    /// Every discovered link, the initial page included
    All,
    /// Only the initial page
    InitialOnly,
    /// Discovered links not containing any of the patterns
    Exclude(Vec<String>),
    /// A caller supplied list that replaces the discovered one
    Explicit(Vec<String>),
    /// Ask the user for each discovered link
    Prompt,
}

/// Options for configuring an audit
pub struct AuditOptions {
    pub url: String,
    pub selection: Selection,
    pub spider: SpiderOptions,
    pub show_progress_bars: bool,
}

/// Callback for reporting audit progress
pub type AuditProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Everything an audit produced
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub discovered: Vec<String>,
    pub selected: Vec<String>,
    pub report: UnusedReport,
    pub stats: TraversalStats,
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Apply a selection policy to the discovered links.
/// `prompt` is only consulted for [`Selection::Prompt`].
pub fn select_links<P>(discovered: &[String], selection: &Selection, mut prompt: P) -> Vec<String>
where
    P: FnMut(&str) -> bool,
{
    match selection {
        Selection::All => discovered.to_vec(),
        Selection::InitialOnly => discovered.iter().take(1).cloned().collect(),
        Selection::Exclude(patterns) => discovered
            .iter()
            .filter(|link| !patterns.iter().any(|pattern| link.contains(pattern.as_str())))
            .cloned()
            .collect(),
        Selection::Explicit(urls) => urls.clone(),
        Selection::Prompt => discovered
            .iter()
            .filter(|link| prompt(link.as_str()))
            .cloned()
            .collect(),
    }
}

fn ask_to_analyze(link: &str, progress_bar: Option<&ProgressBar>) -> bool {
    let ask = || {
        print!("Analyze {}? [Y/n]: ", link);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut response = String::new();
        if io::stdin().read_line(&mut response).is_err() {
            return false;
        }
        let response = response.trim().to_lowercase();

        response.is_empty() || response == "y" || response == "yes"
    };

    match progress_bar {
        Some(pb) => pb.suspend(ask),
        None => ask(),
    }
}

/// Load the initial page and list the links an audit could visit
pub async fn discover_links(url: &str, options: &SpiderOptions) -> Result<Vec<String>> {
    let mut spider = Spider::http(options)?;
    Ok(spider.start(url).await?.to_vec())
}

/// Execute an audit with the given options
pub async fn execute_audit(
    options: AuditOptions,
    progress_callback: Option<AuditProgressCallback>,
    unused_callback: Option<UnusedCallback>,
) -> Result<AuditOutcome> {
    let AuditOptions {
        url,
        selection,
        spider: spider_options,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Discovering links on {}...", url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut spider = Spider::http(&spider_options)?;

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        spider = spider.with_visit_callback(Arc::new(move |url: &str, remaining: usize| {
            pb_clone.set_message(format!(
                "Analyzing {} ({} queued)",
                extract_url_path(url),
                remaining
            ));
        }));
    }

    if let Some(callback) = unused_callback {
        // Findings are printed by the caller, keep the spinner out of the way
        let pb_clone = progress_bar.clone();
        spider = spider.with_unused_callback(Arc::new(move |label: &str, selectors: &[String]| {
            match pb_clone {
                Some(ref pb) => pb.suspend(|| callback(label, selectors)),
                None => callback(label, selectors),
            }
        }));
    }

    let notify = |msg: String| {
        if let Some(ref callback) = progress_callback {
            match progress_bar {
                Some(ref pb) => pb.suspend(|| callback(msg)),
                None => callback(msg),
            }
        }
    };

    let discovered = spider.start(&url).await?.to_vec();
    notify(format!("Discovered {} links on {}", discovered.len(), url));

    let selected = select_links(&discovered, &selection, |link| {
        ask_to_analyze(link, progress_bar.as_deref())
    });
    info!("{} of {} links selected", selected.len(), discovered.len());
    notify(format!("Analyzing {} pages", selected.len()));

    let report = spider.run(&selected).await.clone();
    let stats = spider.stats().clone();

    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }

    Ok(AuditOutcome {
        discovered,
        selected,
        report,
        stats,
    })
}
