//! Sitemap and URL list parsing.
//!
//! Sitemaps are read leniently: every `<loc>` element is taken in document
//! order, without validating the surrounding XML. This accepts both
//! `urlset` documents and sitemap indexes, and tolerates the slightly broken
//! XML some generators emit.

use std::sync::LazyLock;

use regex::Regex;
use sitebundle_shared::{Result, SiteBundleError};
use url::Url;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `<loc>...</loc>`, possibly spanning lines.
static LOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<loc>(.*?)</loc>").expect("loc regex"));

// ---------------------------------------------------------------------------
// Sitemap
// ---------------------------------------------------------------------------

/// Extract every `<loc>` value from a sitemap document, in order.
pub fn parse_sitemap(content: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(content)
        .map(|caps| decode_entities(caps[1].trim()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Decode the five predefined XML entities.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        // last, so `&amp;lt;` decodes to `&lt;` rather than `<`
        .replace("&amp;", "&")
}

// ---------------------------------------------------------------------------
// URL list files
// ---------------------------------------------------------------------------

/// Parse a URL list: one URL per line.
///
/// Surrounding whitespace and trailing backslashes (shell line continuations
/// left over from copy/paste) are stripped. Blank lines and `#` comments are
/// skipped.
pub fn parse_url_list(content: &str) -> Result<Vec<Url>> {
    let mut urls = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let cleaned = line.trim().trim_end_matches('\\').trim_end();
        if cleaned.is_empty() || cleaned.starts_with('#') {
            continue;
        }

        let url = Url::parse(cleaned).map_err(|e| {
            SiteBundleError::parse(format!("line {}: invalid URL '{cleaned}': {e}", idx + 1))
        })?;
        urls.push(url);
    }

    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sitemap_fixture() {
        let content = std::fs::read_to_string("../../../fixtures/sitemap/sitemap.xml")
            .expect("read fixture");
        let locs = parse_sitemap(&content);

        assert_eq!(locs.len(), 7);
        assert_eq!(locs[0], "https://docs.example.com/");
        assert_eq!(locs[1], "https://docs.example.com/getting-started/installation");
        // Multi-line <loc> is trimmed
        assert_eq!(locs[3], "https://docs.example.com/api/reference/client");
        // Entities are decoded
        assert_eq!(
            locs[4],
            "https://docs.example.com/api/reference/server?lang=en&v=2"
        );
    }

    #[test]
    fn parse_sitemap_without_locs() {
        assert!(parse_sitemap("<urlset></urlset>").is_empty());
        assert!(parse_sitemap("").is_empty());
        assert!(parse_sitemap("<loc>   </loc>").is_empty());
    }

    #[test]
    fn parse_sitemap_index() {
        let content = r#"<sitemapindex>
            <sitemap><loc>https://a.example.com/sitemap-1.xml</loc></sitemap>
            <sitemap><loc>https://a.example.com/sitemap-2.xml</loc></sitemap>
        </sitemapindex>"#;
        let locs = parse_sitemap(content);
        assert_eq!(
            locs,
            vec![
                "https://a.example.com/sitemap-1.xml".to_string(),
                "https://a.example.com/sitemap-2.xml".to_string(),
            ]
        );
    }

    #[test]
    fn decode_amp_last() {
        assert_eq!(decode_entities("a&amp;lt;b"), "a&lt;b");
        assert_eq!(decode_entities("plain"), "plain");
    }

    #[test]
    fn parse_url_list_fixture() {
        let content =
            std::fs::read_to_string("../../../fixtures/urls/pages.txt").expect("read fixture");
        let urls = parse_url_list(&content).unwrap();

        assert_eq!(urls.len(), 4);
        assert_eq!(
            urls[1].as_str(),
            "https://docs.example.com/getting-started/quickstart"
        );
        assert_eq!(urls[3].path(), "/api/reference/server");
    }

    #[test]
    fn parse_url_list_reports_line_number() {
        let err = parse_url_list("https://ok.example.com/\nnot a url\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
