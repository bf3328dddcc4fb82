use crate::extract::extract_selectors;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Stylesheet text found while visiting one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSource {
    /// Stylesheet URL, or `inline styles (<page-url>)` for `<style>` blocks.
    pub label: String,
    /// One entry per `<style>` block; a linked stylesheet has exactly one.
    pub css: Vec<String>,
}

impl StyleSource {
    pub fn inline(page_url: &str, blocks: Vec<String>) -> Self {
        Self {
            label: inline_label(page_url),
            css: blocks,
        }
    }

    pub fn linked(url: String, css: String) -> Self {
        Self {
            label: url,
            css: vec![css],
        }
    }

    /// Candidate selectors across every block, in source order.
    pub fn selectors(&self) -> Vec<String> {
        self.css
            .iter()
            .flat_map(|block| extract_selectors(block))
            .collect()
    }
}

pub fn inline_label(page_url: &str) -> String {
    format!("inline styles ({})", page_url)
}

/// Unused selectors per style source, in the order sources were first reported.
///
/// Reporting a label again replaces its selectors but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnusedReport {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl UnusedReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: String, selectors: Vec<String>) {
        let existing = self.index.get(&label).copied();
        match existing {
            Some(i) => self.entries[i].1 = selectors,
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, selectors));
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.index
            .get(label)
            .map(|&i| self.entries[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(label, selectors)| (label.as_str(), selectors.as_slice()))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(label, _)| label.as_str()).collect()
    }

    /// Number of sources with findings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unused selectors across every source.
    pub fn total_selectors(&self) -> usize {
        self.entries.iter().map(|(_, selectors)| selectors.len()).sum()
    }
}

impl Serialize for UnusedReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, selectors) in &self.entries {
            map.serialize_entry(label, selectors)?;
        }
        map.end()
    }
}

/// Counters for one traversal run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TraversalStats {
    pub pages_visited: usize,
    pub pages_failed: usize,
    pub sources_reported: usize,
    pub selectors_checked: usize,
    pub selectors_unused: usize,
    pub selectors_unevaluable: usize,
}
