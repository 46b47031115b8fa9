//! URL filtering and site-section splitting.

use std::collections::HashSet;

use regex::Regex;
use tracing::debug;
use url::Url;

// ---------------------------------------------------------------------------
// UrlFilter
// ---------------------------------------------------------------------------

/// Decides which discovered URLs are bundled.
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    /// Include patterns (if non-empty, the path must match at least one).
    include_patterns: Vec<Regex>,
    /// Exclude patterns (if the path matches any, it's dropped).
    exclude_patterns: Vec<Regex>,
    skip_numeric_segments: bool,
}

impl UrlFilter {
    /// Build a filter from glob-like path patterns (`*`, `**`, `?`).
    /// Patterns that fail to compile are ignored.
    pub fn new(include: &[String], exclude: &[String], skip_numeric_segments: bool) -> Self {
        Self {
            include_patterns: include.iter().filter_map(|p| glob_to_regex(p)).collect(),
            exclude_patterns: exclude.iter().filter_map(|p| glob_to_regex(p)).collect(),
            skip_numeric_segments,
        }
    }

    /// Whether a single URL passes the filter.
    pub fn accepts(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let path = url.path();

        if self.exclude_patterns.iter().any(|p| p.is_match(path)) {
            return false;
        }

        if !self.include_patterns.is_empty()
            && !self.include_patterns.iter().any(|p| p.is_match(path))
        {
            return false;
        }

        if self.skip_numeric_segments {
            let segments = path_segments(url);
            if segments.len() > 1 && is_numeric(segments[1]) {
                return false;
            }
        }

        true
    }

    /// Filter a URL list, dropping rejected URLs and repeats while keeping
    /// the first-seen order.
    pub fn apply(&self, urls: Vec<Url>) -> Vec<Url> {
        let mut seen = HashSet::new();
        let total = urls.len();

        let kept: Vec<Url> = urls
            .into_iter()
            .filter(|url| self.accepts(url))
            .filter(|url| seen.insert(url.as_str().to_string()))
            .collect();

        debug!(total, kept = kept.len(), "filtered source URLs");
        kept
    }
}

/// Convert a glob-like pattern to a regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).ok()
}

/// Whether a path segment reads as a number (`2024`, `1.5`, `-3`).
pub fn is_numeric(s: &str) -> bool {
    s.parse::<f64>().is_ok()
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path().split('/').filter(|s| !s.is_empty()).collect()
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// URLs sharing the same top-level path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// First path segment (e.g. `guides`).
    pub name: String,
    /// Member URLs, in discovery order.
    pub urls: Vec<Url>,
}

/// Split URLs by their top-level path segment, in first-seen order.
///
/// URLs with fewer than two path segments (the site root and top-level
/// landing pages) and URLs whose second segment is numeric are left out.
pub fn split_by_section(urls: &[Url]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();

    for url in urls {
        let segments = path_segments(url);
        if segments.len() < 2 || is_numeric(segments[1]) {
            continue;
        }

        let name = segments[0];
        match sections.iter_mut().find(|s| s.name == name) {
            Some(section) => section.urls.push(url.clone()),
            None => sections.push(Section {
                name: name.to_string(),
                urls: vec![url.clone()],
            }),
        }
    }

    sections
}
