use crate::document::Document;
use tracing::debug;

/// Verdict for one candidate selector against one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Used,
    Unused,
    /// The selector engine couldn't evaluate it. Never reported as unused.
    Unevaluable,
}

pub fn check_usage(selector: &str, document: &Document) -> Usage {
    match document.query(selector) {
        Ok(matches) if matches.is_empty() => Usage::Unused,
        Ok(_) => Usage::Used,
        Err(e) => {
            // Fail open: an engine error is never a finding
            debug!("Not evaluating selector on {}: {}", document.url(), e);
            Usage::Unevaluable
        }
    }
}

pub fn is_unused(selector: &str, document: &Document) -> bool {
    check_usage(selector, document) == Usage::Unused
}

/// Outcome of checking a batch of selectors against one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSummary {
    pub unused: Vec<String>,
    pub checked: usize,
    pub unevaluable: usize,
}

pub fn find_unused<I>(selectors: I, document: &Document) -> UsageSummary
where
    I: IntoIterator<Item = String>,
{
    let mut summary = UsageSummary::default();

    for selector in selectors {
        summary.checked += 1;
        match check_usage(&selector, document) {
            Usage::Unused => summary.unused.push(selector),
            Usage::Unevaluable => summary.unevaluable += 1,
            Usage::Used => {}
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_selectors;
    use url::Url;

    fn page(body: &str) -> Document {
        Document::parse(Url::parse("http://example.com/").unwrap(), body)
    }

    #[test]
    fn test_used_and_unused() {
        let doc = page(r#"<div class="used"></div>"#);
        assert_eq!(check_usage(".used", &doc), Usage::Used);
        assert_eq!(check_usage(".unused", &doc), Usage::Unused);
        assert!(is_unused(".unused", &doc));
        assert!(!is_unused(".used", &doc));
    }

    #[test]
    fn test_invalid_selectors_fail_open() {
        let doc = page("<div></div>");
        for selector in [":::bad", "", "div[", "p::before", "@media screen{.a"] {
            assert_eq!(check_usage(selector, &doc), Usage::Unevaluable, "{selector}");
            assert!(!is_unused(selector, &doc), "{selector}");
        }
    }

    #[test]
    fn test_group_is_used_when_any_member_matches() {
        let doc = page(r#"<h1>t</h1>"#);
        assert_eq!(check_usage("h1, .nothing", &doc), Usage::Used);
        assert_eq!(check_usage("h2, .nothing", &doc), Usage::Unused);
    }

    #[test]
    fn test_find_unused_end_to_end() {
        let doc = page(r#"<div class="used"></div>"#);
        let css = ".used{color:red}\n.unused{color:blue}\n:::bad{x:y}";
        let summary = find_unused(extract_selectors(css), &doc);

        assert_eq!(summary.unused, vec![".unused"]);
        assert_eq!(summary.checked, 3);
        assert_eq!(summary.unevaluable, 1);
    }
}
