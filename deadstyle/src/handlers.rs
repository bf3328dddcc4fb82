use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use deadstyle_core::audit::{
    AuditOptions, AuditProgressCallback, Selection, discover_links, execute_audit,
};
use deadstyle_core::report::{ReportFormat, render_report, save_report, source_heading};
use deadstyle_scanner::{SpiderOptions, StylesheetScope, UnusedCallback};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use url::Url;

/// Route logs to stderr so stdout stays clean for reports
pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read URL file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Skipping invalid URL '{}'", line);
    None
}

/// Work out which discovered links the scan should analyze
pub fn selection_from_args(args: &ArgMatches) -> Result<Selection, String> {
    if let Some(path) = args.get_one::<PathBuf>("url-file") {
        let expanded = expand_output_path(&path.to_string_lossy());
        return load_urls_from_file(&expanded).map(Selection::Explicit);
    }
    if args.get_flag("no-follow") {
        return Ok(Selection::InitialOnly);
    }
    if args.get_flag("interactive") {
        return Ok(Selection::Prompt);
    }

    let patterns: Vec<String> = args
        .get_many::<String>("exclude")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    if patterns.is_empty() {
        Ok(Selection::All)
    } else {
        Ok(Selection::Exclude(patterns))
    }
}

pub fn spider_options_from_args(args: &ArgMatches) -> SpiderOptions {
    let mut options = SpiderOptions::default();

    if let Some(timeout) = args.get_one::<u64>("timeout") {
        options = options.with_timeout(*timeout);
    }
    if let Some(user_agent) = args.get_one::<String>("user-agent") {
        options = options.with_user_agent(user_agent.clone());
    }
    // `links` has no stylesheet flags
    if let Ok(Some(true)) = args.try_get_one::<bool>("cross-origin-styles").map(|v| v.copied()) {
        options = options.with_stylesheet_scope(StylesheetScope::Any);
    }

    options
}

/// Where the scan's findings end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDestination {
    /// Text findings printed as each source is analyzed
    Streamed,
    /// A rendered report on stdout; nothing else may be printed there
    Stdout,
    File(PathBuf),
}

pub fn report_destination(args: &ArgMatches, format: ReportFormat) -> ReportDestination {
    match args.get_one::<String>("output") {
        Some(output) => ReportDestination::File(expand_output_path(output)),
        None if format == ReportFormat::Text => ReportDestination::Streamed,
        None => ReportDestination::Stdout,
    }
}

/// Expand a leading `~` in a user supplied path
pub fn expand_output_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn print_unused(label: &str, selectors: &[String]) {
    println!();
    println!("{}", source_heading(label, selectors).bright_white().bold());
    for selector in selectors {
        println!("  {} {}", "•".yellow(), selector);
    }
}

fn start_url(args: &ArgMatches) -> anyhow::Result<Url> {
    args.get_one::<Url>("url")
        .cloned()
        .ok_or_else(|| anyhow!("--url must be provided"))
}

async fn run_links(args: &ArgMatches) -> anyhow::Result<()> {
    let url = start_url(args)?;
    let options = spider_options_from_args(args);

    let links = discover_links(url.as_str(), &options)
        .await
        .with_context(|| format!("Failed to load {}", url))?;

    println!(
        "\n{} {} same-site link(s) on {}\n",
        "✓".green().bold(),
        links.len(),
        url.as_str().bright_white()
    );
    for link in &links {
        println!("  {} {}", "•".blue(), link);
    }

    Ok(())
}

async fn run_scan(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let url = start_url(args)?;
    let format_name = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown report format '{}'", format_name))?;
    let selection = selection_from_args(args).map_err(anyhow::Error::msg)?;
    let spider = spider_options_from_args(args);
    let title = args
        .get_one::<String>("title")
        .cloned()
        .unwrap_or_else(|| url.to_string());

    let destination = report_destination(args, format);
    let chatty = !quiet && destination != ReportDestination::Stdout;

    if chatty {
        println!("\n🎨 Auditing {}", url.as_str().bright_white());
        println!("Timeout: {}s", spider.timeout_secs);
        let scope = match spider.stylesheet_scope {
            StylesheetScope::SameSite => "same site only",
            StylesheetScope::Any => "any origin",
        };
        println!("Stylesheets: {}\n", scope);
    }

    let options = AuditOptions {
        url: url.to_string(),
        selection,
        spider,
        show_progress_bars: !quiet,
    };

    let progress_callback: Option<AuditProgressCallback> = if chatty {
        Some(Arc::new(|msg: String| {
            println!("{} {}", "→".blue(), msg);
        }))
    } else {
        None
    };

    let unused_callback: Option<UnusedCallback> = if format == ReportFormat::Text {
        Some(Arc::new(|label: &str, selectors: &[String]| {
            print_unused(label, selectors);
        }))
    } else {
        None
    };

    let outcome = execute_audit(options, progress_callback, unused_callback)
        .await
        .with_context(|| format!("Audit of {} failed", url))?;

    if destination == ReportDestination::Stdout {
        let rendered = render_report(&outcome.report, &outcome.stats, format, &title)
            .context("Failed to render report")?;
        print!("{}", rendered);
        return Ok(());
    }

    println!(
        "\n{} {} unused CSS selectors across {} page(s)",
        "✓".green().bold(),
        outcome.report.total_selectors(),
        outcome.stats.pages_visited
    );
    if outcome.stats.pages_failed > 0 {
        println!(
            "{} {} page(s) could not be loaded",
            "⚠".yellow().bold(),
            outcome.stats.pages_failed
        );
    }

    if let ReportDestination::File(path) = destination {
        let rendered = render_report(&outcome.report, &outcome.stats, format, &title)
            .context("Failed to render report")?;
        save_report(&rendered, &path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!(
            "{} Report saved to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }

    Ok(())
}

pub async fn handle_links(sub_matches: &ArgMatches) {
    if let Err(e) = run_links(sub_matches).await {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

pub async fn handle_scan(sub_matches: &ArgMatches, quiet: bool) {
    if let Err(e) = run_scan(sub_matches, quiet).await {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
