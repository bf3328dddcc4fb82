//! Best-effort selector extraction from raw stylesheet text.
//!
//! This is not a CSS parser. Comments, newlines and tabs are stripped and every
//! rule preamble (the text between the previous `}` and the next `{`) becomes
//! one candidate selector. Grouped selectors such as `.a, .b` stay together and
//! are evaluated as a single selector list. At-rule blocks (`@media`,
//! `@keyframes`) are not special-cased; their preambles come through as
//! candidates and are filtered out later by the usage check.

use regex::Regex;
use std::sync::LazyLock;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("comment regex is valid"));

/// Strip block comments and the newline/tab characters from stylesheet text.
pub fn strip_noise(css: &str) -> String {
    BLOCK_COMMENT
        .replace_all(css, "")
        .chars()
        .filter(|c| !matches!(c, '\n' | '\t'))
        .collect()
}

/// Extract candidate selectors from raw CSS text, in source order.
pub fn extract_selectors(css: &str) -> Vec<String> {
    let flattened = strip_noise(css);

    let mut selectors = Vec::new();
    for segment in flattened.split('}') {
        // A preamble can't contain `}`, so it always ends at the last `{` of its segment
        let Some(open) = segment.rfind('{') else {
            continue;
        };
        if open == 0 {
            continue;
        }

        let candidate = segment[..open].trim();
        if !candidate.is_empty() {
            selectors.push(candidate.to_string());
        }
    }

    selectors
}
