//! Page discovery: sitemaps and URL list files.
//!
//! A bundle run starts from an ordered list of page URLs. The list comes
//! either from a published `sitemap.xml` or from a local text file with one
//! URL per line. The order found here is the order pages appear in the
//! output bundles.

mod filter;
mod parser;

use std::path::Path;

use reqwest::Client;
use sitebundle_shared::{Result, RunConfig, SiteBundleError};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use filter::{Section, UrlFilter, is_numeric, split_by_section};
pub use parser::{parse_sitemap, parse_url_list};

/// Maximum number of redirects to follow when fetching a sitemap.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for fetching a sitemap.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum response size we accept (the sitemap protocol caps files at 50 MB).
const MAX_RESPONSE_SIZE: u64 = 50 * 1024 * 1024;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("SiteBundle/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery process.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
    /// URL path include patterns.
    pub include_patterns: Vec<String>,
    /// URL path exclude patterns.
    pub exclude_patterns: Vec<String>,
    /// Drop URLs whose second path segment is numeric.
    pub skip_numeric_segments: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            skip_numeric_segments: false,
        }
    }
}

impl From<&RunConfig> for DiscoveryOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            timeout_secs: config.discovery_timeout_secs,
            include_patterns: config.include_patterns.clone(),
            exclude_patterns: config.exclude_patterns.clone(),
            skip_numeric_segments: config.skip_numeric_segments,
        }
    }
}

impl DiscoveryOptions {
    fn filter(&self) -> UrlFilter {
        UrlFilter::new(
            &self.include_patterns,
            &self.exclude_patterns,
            self.skip_numeric_segments,
        )
    }
}

// ---------------------------------------------------------------------------
// Main entry points
// ---------------------------------------------------------------------------

/// Resolve the page list for a run.
///
/// `input` is either an `http(s)://` sitemap URL or a path to a URL list
/// file. The result is filtered and de-duplicated, keeping source order.
#[instrument(skip_all, fields(input = %input))]
pub async fn load_sources(input: &str, opts: &DiscoveryOptions) -> Result<Vec<Url>> {
    let urls = if is_remote(input) {
        let sitemap_url = Url::parse(input)
            .map_err(|e| SiteBundleError::validation(format!("invalid URL '{input}': {e}")))?;
        fetch_sitemap(&sitemap_url, opts).await?
    } else {
        read_url_list(Path::new(input))?
    };

    let kept = opts.filter().apply(urls);
    info!(pages = kept.len(), "source pages resolved");
    Ok(kept)
}

/// Fetch a sitemap and return its page URLs in document order.
///
/// Entries that are not valid absolute URLs are skipped with a warning.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_sitemap(url: &Url, opts: &DiscoveryOptions) -> Result<Vec<Url>> {
    info!("fetching sitemap");

    let client = build_client(opts)?;
    let body = fetch_text(&client, url.as_str()).await?;

    let locs = parse_sitemap(&body);
    if locs.is_empty() {
        return Err(SiteBundleError::parse(format!(
            "{url}: no <loc> entries found"
        )));
    }

    let mut urls = Vec::with_capacity(locs.len());
    for loc in locs {
        match Url::parse(&loc) {
            Ok(u) => urls.push(u),
            Err(e) => warn!(%loc, error = %e, "skipping invalid sitemap entry"),
        }
    }

    info!(entries = urls.len(), "sitemap parsed");
    Ok(urls)
}

/// Read a URL list file (one URL per line).
pub fn read_url_list(path: &Path) -> Result<Vec<Url>> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteBundleError::io(path, e))?;
    let urls = parse_url_list(&content)?;
    debug!(path = %path.display(), count = urls.len(), "read URL list");
    Ok(urls)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_remote(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &DiscoveryOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| SiteBundleError::Network(format!("failed to build HTTP client: {e}")))
}

/// Fetch a URL and return its body as text.
async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SiteBundleError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SiteBundleError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(SiteBundleError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| SiteBundleError::Network(format!("{url}: failed to read body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mock_sitemap(server: &wiremock::MockServer, body: String) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/sitemap.xml"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://docs.example.com/sitemap.xml"));
        assert!(is_remote("http://localhost:8080/sitemap.xml"));
        assert!(!is_remote("urls.txt"));
        assert!(!is_remote("/tmp/https.txt"));
    }

    #[tokio::test]
    async fn fetch_sitemap_with_mock_server() {
        let server = wiremock::MockServer::start().await;
        let content = std::fs::read_to_string("../../../fixtures/sitemap/sitemap.xml")
            .expect("read sitemap fixture");
        mock_sitemap(&server, content).await;

        let url = Url::parse(&format!("{}/sitemap.xml", server.uri())).unwrap();
        let urls = fetch_sitemap(&url, &DiscoveryOptions::default()).await.unwrap();

        assert_eq!(urls.len(), 7);
        assert_eq!(urls[1].path(), "/getting-started/installation");
    }

    #[tokio::test]
    async fn fetch_sitemap_http_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/sitemap.xml"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/sitemap.xml", server.uri())).unwrap();
        let err = fetch_sitemap(&url, &DiscoveryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SiteBundleError::Network(_)));
    }

    #[tokio::test]
    async fn fetch_sitemap_without_entries() {
        let server = wiremock::MockServer::start().await;
        mock_sitemap(&server, "<urlset></urlset>".into()).await;

        let url = Url::parse(&format!("{}/sitemap.xml", server.uri())).unwrap();
        let err = fetch_sitemap(&url, &DiscoveryOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no <loc> entries"));
    }

    #[tokio::test]
    async fn load_sources_applies_filters() {
        let server = wiremock::MockServer::start().await;
        let content = std::fs::read_to_string("../../../fixtures/sitemap/sitemap.xml")
            .expect("read sitemap fixture");
        mock_sitemap(&server, content).await;

        let opts = DiscoveryOptions {
            exclude_patterns: vec!["/guides/**".into()],
            skip_numeric_segments: true,
            ..DiscoveryOptions::default()
        };
        let input = format!("{}/sitemap.xml", server.uri());
        let urls = load_sources(&input, &opts).await.unwrap();

        // 7 entries minus /guides/deployment and /blog/2024/...
        assert_eq!(urls.len(), 5);
        assert!(urls.iter().all(|u| !u.path().starts_with("/guides")));
        assert!(urls.iter().all(|u| !u.path().starts_with("/blog")));
    }

    #[tokio::test]
    async fn load_sources_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "https://docs.example.com/a/x\nhttps://docs.example.com/a/x\nhttps://docs.example.com/b/y\n",
        )
        .unwrap();

        let urls = load_sources(path.to_str().unwrap(), &DiscoveryOptions::default())
            .await
            .unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[tokio::test]
    async fn load_sources_missing_file() {
        let err = load_sources("/definitely/not/here.txt", &DiscoveryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SiteBundleError::Io { .. }));
    }
}
