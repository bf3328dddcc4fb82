// Report rendering and export

use deadstyle_scanner::{TraversalStats, UnusedReport};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Version of the exported data format.
pub const DATA_VERSION: &str = "1.0.0";
pub const APP_NAME: &str = "deadstyle";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// The whole report as one JSON-serializable blob, ready to hand to a paste
/// or storage service.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPayload<'a> {
    pub appname: &'static str,
    pub title: String,
    pub version: &'static str,
    pub summary: String,
    pub generated_at: String,
    pub report: &'a UnusedReport,
}

pub fn summary_line(report: &UnusedReport) -> String {
    format!("{} unused CSS selectors", report.total_selectors())
}

pub fn build_payload<'a>(report: &'a UnusedReport, title: &str) -> ReportPayload<'a> {
    ReportPayload {
        appname: APP_NAME,
        title: title.to_string(),
        version: DATA_VERSION,
        summary: summary_line(report),
        generated_at: chrono::Utc::now().to_rfc3339(),
        report,
    }
}

/// Heading used for one source in listings, e.g. `site.css (3 found)`.
pub fn source_heading(label: &str, selectors: &[String]) -> String {
    format!("{} ({} found)", label, selectors.len())
}

pub fn generate_text_report(report: &UnusedReport, stats: &TraversalStats, title: &str) -> String {
    let mut out = String::new();

    out.push_str(RULE);
    out.push_str("                        DEADSTYLE UNUSED SELECTOR REPORT\n");
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!("Target:        {}\n", title));
    out.push_str(&format!(
        "Pages:         {} visited, {} failed\n",
        stats.pages_visited, stats.pages_failed
    ));
    out.push_str(&format!(
        "Selectors:     {} checked, {} not evaluable\n",
        stats.selectors_checked, stats.selectors_unevaluable
    ));
    out.push_str(&format!("Summary:       {}\n\n", summary_line(report)));

    if report.is_empty() {
        out.push_str("No unused selectors found.\n\n");
    }

    for (label, selectors) in report.iter() {
        out.push_str(RULE);
        out.push_str(&source_heading(label, selectors));
        out.push('\n');
        out.push_str(RULE);
        for selector in selectors {
            out.push_str(&format!("  {}\n", selector));
        }
        out.push('\n');
    }

    out.push_str(RULE);
    out.push_str("                          End of Report\n");
    out.push_str(RULE);

    out
}

/// Wrap `text` in a Markdown code span. Backslashes are literal inside code
/// spans, so embedded backticks need a longer fence instead of escaping.
pub fn code_span(text: &str) -> String {
    let longest_run = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);

    if text.starts_with('`') || text.ends_with('`') {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

pub fn generate_markdown_report(
    report: &UnusedReport,
    stats: &TraversalStats,
    title: &str,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Unused CSS selectors: {}\n\n", title));
    out.push_str(&format!(
        "**{}** across {} sources ({} pages visited, {} failed).\n\n",
        summary_line(report),
        report.len(),
        stats.pages_visited,
        stats.pages_failed
    ));

    for (label, selectors) in report.iter() {
        out.push_str(&format!("## {}\n\n", source_heading(label, selectors)));
        for selector in selectors {
            out.push_str(&format!("- {}\n", code_span(selector)));
        }
        out.push('\n');
    }

    out
}

pub fn generate_json_report(
    report: &UnusedReport,
    title: &str,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&build_payload(report, title))
}

pub fn render_report(
    report: &UnusedReport,
    stats: &TraversalStats,
    format: ReportFormat,
    title: &str,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report, stats, title)),
        ReportFormat::Markdown => Ok(generate_markdown_report(report, stats, title)),
        ReportFormat::Json => generate_json_report(report, title),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
