//! Core domain types for SiteBundle runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the bundle manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for bundle run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// BundleManifest
// ---------------------------------------------------------------------------

/// The `<stem>.manifest.json` written next to the bundle outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Identifier of the run that produced the bundles.
    pub id: RunId,
    /// Where the page list came from (sitemap URL or list file).
    pub source: String,
    /// Tool version that created the bundles.
    pub tool_version: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the last bundle was written.
    pub finished_at: DateTime<Utc>,
    /// Target words per bundle.
    pub word_limit: u64,
    /// Soft-zone tolerance used.
    pub tolerance: f64,
    /// Written bundles, in output order.
    pub bundles: Vec<BundleEntry>,
    /// Pages that could not be rendered or measured.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
}

impl BundleManifest {
    /// Total words across every bundle.
    pub fn total_words(&self) -> u64 {
        self.bundles.iter().map(|b| b.words).sum()
    }

    /// Total pages across every bundle.
    pub fn page_count(&self) -> usize {
        self.bundles.iter().map(|b| b.pages.len()).sum()
    }
}

/// One written output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Output file name (relative to the manifest's directory).
    pub file: String,
    /// Word count of all pages in the bundle.
    pub words: u64,
    /// Source URLs, in bundle order.
    pub pages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn manifest_serialization() {
        let manifest = BundleManifest {
            schema_version: CURRENT_SCHEMA_VERSION,
            id: RunId::new(),
            source: "https://example.com/sitemap.xml".into(),
            tool_version: "0.1.0".into(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            word_limit: 1000,
            tolerance: 0.2,
            bundles: vec![BundleEntry {
                file: "docs.pdf".into(),
                words: 950,
                pages: vec![
                    "https://example.com/a/b/x".into(),
                    "https://example.com/a/b/y".into(),
                ],
            }],
            failed: vec![],
        };

        let json = serde_json::to_string_pretty(&manifest).expect("serialize");
        assert!(!json.contains("failed"));
        let parsed: BundleManifest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(parsed.total_words(), 950);
        assert_eq!(parsed.page_count(), 2);
    }

    #[test]
    fn manifest_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/manifest.fixture.json")
            .expect("read fixture");
        let parsed: BundleManifest =
            serde_json::from_str(&fixture).expect("deserialize fixture manifest");
        assert_eq!(parsed.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(parsed.bundles.len(), 2);
        assert_eq!(parsed.bundles[0].file, "torizon_1.pdf");
        assert_eq!(parsed.page_count(), 3);
        assert_eq!(parsed.failed.len(), 1);
    }
}
