//! Sequential bundler: cuts an ordered page sequence into size-bounded groups.
//!
//! Pages are taken strictly in input order and each group is a consecutive
//! run. Around the word limit there is a soft zone of `±tolerance` where the
//! page's structural path decides: a page from the same section as the
//! previous one stays, a page from another section starts a new bundle.
//! Below the soft zone pages are always appended, above it a new bundle is
//! always started.

use sitebundle_shared::{Result, SiteBundleError};
use tracing::debug;

use crate::structure::{StructuralPath, differs};

/// Default target words per bundle.
pub const DEFAULT_WORD_LIMIT: u64 = 100_000;

/// Default soft-zone tolerance (80% to 120% of the limit).
pub const DEFAULT_TOLERANCE: f64 = 0.2;

// ---------------------------------------------------------------------------
// Item / Group
// ---------------------------------------------------------------------------

/// One sized, path-tagged unit to bundle.
///
/// `content` is opaque to the bundler: it is moved into a group and never
/// inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<C> {
    pub content: C,
    pub words: u64,
    pub structure: StructuralPath,
    /// Originating location, for reporting only.
    pub source: String,
}

impl<C> Item<C> {
    pub fn new(
        content: C,
        words: u64,
        structure: StructuralPath,
        source: impl Into<String>,
    ) -> Self {
        Self {
            content,
            words,
            structure,
            source: source.into(),
        }
    }
}

/// A non-empty, consecutive run of items emitted as one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<C> {
    items: Vec<Item<C>>,
}

impl<C> Group<C> {
    fn start(item: Item<C>) -> Self {
        Self { items: vec![item] }
    }

    pub fn items(&self) -> &[Item<C>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Groups built by [`bundle`] are never empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_words(&self) -> u64 {
        self.items.iter().map(|i| i.words).sum()
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.source.as_str())
    }

    pub fn into_items(self) -> Vec<Item<C>> {
        self.items
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Validated sizing parameters for one bundling run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BundleParams {
    word_limit: u64,
    tolerance: f64,
}

impl BundleParams {
    /// Fails unless `word_limit > 0` and `tolerance` is in `[0, 1)`.
    pub fn new(word_limit: u64, tolerance: f64) -> Result<Self> {
        if word_limit == 0 {
            return Err(SiteBundleError::invalid_params(
                "word_limit must be greater than zero",
            ));
        }
        if !tolerance.is_finite() || !(0.0..1.0).contains(&tolerance) {
            return Err(SiteBundleError::invalid_params(format!(
                "tolerance must be in [0, 1), got {tolerance}"
            )));
        }
        Ok(Self {
            word_limit,
            tolerance,
        })
    }

    pub fn word_limit(&self) -> u64 {
        self.word_limit
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Totals at or below this are always kept together.
    pub fn low_threshold(&self) -> f64 {
        self.word_limit as f64 * (1.0 - self.tolerance)
    }

    /// Totals above this always force a new bundle.
    pub fn high_threshold(&self) -> f64 {
        self.word_limit as f64 * (1.0 + self.tolerance)
    }
}

impl Default for BundleParams {
    fn default() -> Self {
        Self {
            word_limit: DEFAULT_WORD_LIMIT,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

// ---------------------------------------------------------------------------
// Bundling
// ---------------------------------------------------------------------------

/// Partition `items` into consecutive groups.
///
/// Flattening the result reproduces `items` exactly. The soft-zone check
/// compares against the previous item only, so a section that drifts one
/// level at a time can keep growing a bundle until the hard limit.
pub fn bundle<C>(items: Vec<Item<C>>, params: &BundleParams) -> Vec<Group<C>> {
    let low = params.low_threshold();
    let high = params.high_threshold();

    let mut groups: Vec<Group<C>> = Vec::new();
    let mut current: Option<Group<C>> = None;
    // Words already committed to `current`, excluding the item being decided.
    let mut current_words: u64 = 0;
    let mut current_structure = StructuralPath::default();

    for item in items {
        let words = item.words;
        let structure = item.structure.clone();
        let projected = current_words.saturating_add(words) as f64;

        current = Some(match current.take() {
            None => {
                current_words = 0;
                Group::start(item)
            }
            Some(mut group) if projected <= low => {
                group.items.push(item);
                group
            }
            Some(group) if projected > high => {
                groups.push(group);
                current_words = 0;
                Group::start(item)
            }
            Some(mut group) => {
                debug!(
                    current_words,
                    incoming = words,
                    source = %item.source,
                    from = %current_structure,
                    to = %structure,
                    "soft zone, checking structure"
                );
                if differs(&structure, &current_structure) {
                    groups.push(group);
                    current_words = 0;
                    Group::start(item)
                } else {
                    group.items.push(item);
                    group
                }
            }
        });

        current_words = current_words.saturating_add(words);
        current_structure = structure;
    }

    if let Some(group) = current {
        groups.push(group);
    }

    debug!(groups = groups.len(), "bundling complete");
    groups
}
