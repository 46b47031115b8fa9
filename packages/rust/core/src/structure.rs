//! Structural paths and the section-break comparator.
//!
//! A page's structural path is the directory part of its URL path. Two pages
//! belong to the same section when everything above their leaf segment
//! matches, so `a/b/c/d` and `a/b/c/e` are the same section while `a/b/c/d`
//! and `a/b/e/f` are not.

use url::Url;

/// Ordered, non-empty path segments describing where a page sits in a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StructuralPath(Vec<String>);

impl StructuralPath {
    /// Parse a `/`-separated descriptor. Trailing separators are stripped and
    /// empty segments dropped, so `"/a//b/"` is `[a, b]` and `""` is empty.
    pub fn parse(descriptor: &str) -> Self {
        Self::from_segments(descriptor.split('/'))
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            segments
                .into_iter()
                .map(|s| s.as_ref().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `depth` segments, or all of them when shorter.
    fn truncated(&self, depth: usize) -> &[String] {
        &self.0[..depth.min(self.0.len())]
    }
}

impl std::fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// Structural path of a page URL: the directory holding the page.
///
/// `/a/b/page` gives `[a, b]`. A trailing slash marks the last segment as a
/// directory, so `/a/b/` also gives `[a, b]`. Query and fragment are ignored.
pub fn structure_of(url: &Url) -> StructuralPath {
    let path = url.path();
    let dir = match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    };
    StructuralPath::parse(dir)
}

/// Whether two structural paths differ enough to justify a bundle break.
///
/// Only segments above the deeper path's leaf are compared. A path shorter
/// than that depth contributes all of its segments, so a length mismatch
/// after truncation counts as a difference.
pub fn differs(a: &StructuralPath, b: &StructuralPath) -> bool {
    let depth = a.len().max(b.len()).saturating_sub(1);
    a.truncated(depth) != b.truncated(depth)
}
