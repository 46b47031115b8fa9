//! End-to-end `bundle` pipeline: sources → render → measure → bundle → merge → manifest.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use sitebundle_discovery::DiscoveryOptions;
use sitebundle_render::{Merger, RenderOutcome, Renderer, RetryPolicy, WordCounter, render_with_retry};
use sitebundle_shared::{
    BundleEntry, BundleManifest, CURRENT_SCHEMA_VERSION, Result, RunId, SiteBundleError,
};

use crate::bundler::{BundleParams, Group, Item, bundle};
use crate::structure::structure_of;

/// Default number of pages rendered at the same time.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Everything one `bundle` run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct BundleJob {
    /// Sitemap URL or path to a URL list file.
    pub input: String,
    /// Filtering and HTTP settings for resolving `input`.
    pub discovery: DiscoveryOptions,
    /// Requested output path. Several groups produce `<stem>_<n>.pdf` next to it.
    pub output: PathBuf,
    pub params: BundleParams,
    pub retry: RetryPolicy,
    /// Maximum concurrent renders.
    pub concurrency: usize,
    /// Tool version recorded in the manifest.
    pub tool_version: String,
}

/// The external tools a run talks to.
pub struct Collaborators<R, W, M> {
    pub renderer: Arc<R>,
    pub counter: Arc<W>,
    pub merger: M,
}

impl<R, W, M> Collaborators<R, W, M> {
    pub fn new(renderer: R, counter: W, merger: M) -> Self {
        Self {
            renderer: Arc::new(renderer),
            counter: Arc::new(counter),
            merger,
        }
    }
}

/// One bundle written by a run.
#[derive(Debug, Clone)]
pub struct WrittenBundle {
    pub path: PathBuf,
    pub words: u64,
    pub pages: Vec<String>,
}

/// A source page that was dropped from the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPage {
    pub url: String,
    pub reason: String,
}

/// Result of [`run_bundle`].
#[derive(Debug)]
pub struct BundleRunResult {
    pub run_id: RunId,
    /// Written bundles, in output order.
    pub bundles: Vec<WrittenBundle>,
    pub failed: Vec<FailedPage>,
    pub manifest_path: PathBuf,
    /// Number of source pages after filtering.
    pub source_pages: usize,
    pub elapsed: std::time::Duration,
}

impl BundleRunResult {
    pub fn total_words(&self) -> u64 {
        self.bundles.iter().map(|b| b.words).sum()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a page has been rendered and measured.
    fn page_rendered(&self, url: &str, words: u64, current: usize, total: usize);
    /// Called when a page is skipped.
    fn page_failed(&self, url: &str, reason: &str, current: usize, total: usize);
    /// Called after each output file is written.
    fn bundle_written(&self, bundle: &WrittenBundle);
    /// Called when the pipeline completes.
    fn done(&self, result: &BundleRunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_rendered(&self, _url: &str, _words: u64, _current: usize, _total: usize) {}
    fn page_failed(&self, _url: &str, _reason: &str, _current: usize, _total: usize) {}
    fn bundle_written(&self, _bundle: &WrittenBundle) {}
    fn done(&self, _result: &BundleRunResult) {}
}

/// Scratch directory for rendered pages, removed when dropped.
#[derive(Debug)]
pub struct WorkDir {
    dir: tempfile::TempDir,
}

impl WorkDir {
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("sitebundle-")
            .tempdir()
            .map_err(|e| SiteBundleError::io(std::env::temp_dir(), e))?;
        debug!(path = %dir.path().display(), "work directory created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the page at `index` in the source list is rendered.
    pub fn page_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("page_{index}.pdf"))
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Run the full bundle pipeline for one input.
///
/// Pages that cannot be rendered or measured are skipped and listed in the
/// result. The run fails when there are no source pages or when every page
/// was skipped.
#[instrument(skip_all, fields(input = %job.input, output = %job.output.display()))]
pub async fn run_bundle<R, W, M>(
    job: &BundleJob,
    collaborators: &Collaborators<R, W, M>,
    progress: &dyn ProgressReporter,
) -> Result<BundleRunResult>
where
    R: Renderer + 'static,
    W: WordCounter + 'static,
    M: Merger,
{
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();

    let stem = output_stem(&job.output)?;
    info!(%run_id, "starting bundle pipeline");

    // Phase 1: Sources
    progress.phase("Resolving pages");
    let urls = sitebundle_discovery::load_sources(&job.input, &job.discovery).await?;
    if urls.is_empty() {
        return Err(SiteBundleError::validation(format!(
            "no pages to bundle from {}",
            job.input
        )));
    }

    // Phase 2: Render and measure
    progress.phase("Rendering pages");
    let workdir = WorkDir::create()?;
    let (items, failed) = render_pages(
        &urls,
        &workdir,
        collaborators,
        job.retry,
        job.concurrency,
        progress,
    )
    .await;

    if items.is_empty() {
        return Err(SiteBundleError::Render(format!(
            "all {} pages failed to render",
            urls.len()
        )));
    }

    // Phase 3: Bundle
    progress.phase("Bundling");
    let groups = bundle(items, &job.params);
    info!(
        pages = urls.len() - failed.len(),
        bundles = groups.len(),
        "pages grouped"
    );

    // Phase 4: Merge
    progress.phase("Writing bundles");
    let paths = output_paths(&job.output, groups.len());
    if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SiteBundleError::io(parent, e))?;
    }

    let mut bundles = Vec::with_capacity(groups.len());
    for (group, path) in groups.into_iter().zip(paths) {
        let written = write_bundle(&collaborators.merger, group, path).await?;
        progress.bundle_written(&written);
        bundles.push(written);
    }

    // Phase 5: Manifest
    let manifest_path = manifest_path(&job.output, &stem);
    let manifest = BundleManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: run_id.clone(),
        source: job.input.clone(),
        tool_version: job.tool_version.clone(),
        started_at,
        finished_at: Utc::now(),
        word_limit: job.params.word_limit(),
        tolerance: job.params.tolerance(),
        bundles: bundles
            .iter()
            .map(|b| BundleEntry {
                file: file_name(&b.path),
                words: b.words,
                pages: b.pages.clone(),
            })
            .collect(),
        failed: failed.iter().map(|f| f.url.clone()).collect(),
    };
    write_json(&manifest_path, &manifest)?;

    drop(workdir);

    let result = BundleRunResult {
        run_id,
        bundles,
        failed,
        manifest_path,
        source_pages: urls.len(),
        elapsed: start.elapsed(),
    };

    info!(
        bundles = result.bundles.len(),
        words = result.total_words(),
        skipped = result.failed.len(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "bundle pipeline complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Output file for each of `count` groups.
///
/// A single group is written to `output` itself. Several groups are written
/// to `<stem>_<n>.pdf` (1-based) in the same directory.
pub fn output_paths(output: &Path, count: usize) -> Vec<PathBuf> {
    if count == 1 {
        return vec![output.to_path_buf()];
    }

    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    let dir = output.parent().unwrap_or_else(|| Path::new(""));

    (1..=count)
        .map(|n| dir.join(format!("{stem}_{n}.pdf")))
        .collect()
}

// ---------------------------------------------------------------------------
// Render phase
// ---------------------------------------------------------------------------

enum PageOutcome {
    Ready(Item<PathBuf>),
    Failed(String),
}

/// Render and measure every URL, at most `concurrency` at a time.
///
/// Results are collected in source order regardless of completion order.
async fn render_pages<R, W, M>(
    urls: &[Url],
    workdir: &WorkDir,
    collaborators: &Collaborators<R, W, M>,
    retry: RetryPolicy,
    concurrency: usize,
    progress: &dyn ProgressReporter,
) -> (Vec<Item<PathBuf>>, Vec<FailedPage>)
where
    R: Renderer + 'static,
    W: WordCounter + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(urls.len());

    for (index, url) in urls.iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let renderer = Arc::clone(&collaborators.renderer);
        let counter = Arc::clone(&collaborators.counter);
        let url = url.clone();
        let out = workdir.page_path(index);

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return PageOutcome::Failed("render queue closed".to_string());
            };
            render_one(renderer.as_ref(), counter.as_ref(), &url, out, &retry).await
        }));
    }

    let total = handles.len();
    let mut items = Vec::with_capacity(total);
    let mut failed = Vec::new();

    for (index, (handle, url)) in handles.into_iter().zip(urls).enumerate() {
        let outcome = handle
            .await
            .unwrap_or_else(|e| PageOutcome::Failed(format!("render task failed: {e}")));

        match outcome {
            PageOutcome::Ready(item) => {
                progress.page_rendered(url.as_str(), item.words, index + 1, total);
                items.push(item);
            }
            PageOutcome::Failed(reason) => {
                warn!(%url, %reason, "skipping page");
                progress.page_failed(url.as_str(), &reason, index + 1, total);
                failed.push(FailedPage {
                    url: url.to_string(),
                    reason,
                });
            }
        }
    }

    (items, failed)
}

async fn render_one<R: Renderer, W: WordCounter>(
    renderer: &R,
    counter: &W,
    url: &Url,
    out: PathBuf,
    retry: &RetryPolicy,
) -> PageOutcome {
    if let RenderOutcome::Exhausted {
        attempts,
        last_error,
    } = render_with_retry(renderer, url, &out, retry).await
    {
        return PageOutcome::Failed(format!("gave up after {attempts} attempts: {last_error}"));
    }

    match counter.count(&out).await {
        Ok(words) => {
            debug!(%url, words, "page measured");
            PageOutcome::Ready(Item::new(out, words, structure_of(url), url.as_str()))
        }
        Err(e) => PageOutcome::Failed(e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

async fn write_bundle<M: Merger>(
    merger: &M,
    group: Group<PathBuf>,
    path: PathBuf,
) -> Result<WrittenBundle> {
    let words = group.total_words();
    let pages: Vec<String> = group.sources().map(str::to_string).collect();
    let inputs: Vec<PathBuf> = group.into_items().into_iter().map(|i| i.content).collect();

    merger.merge(&inputs, &path).await?;
    info!(path = %path.display(), words, pages = pages.len(), "bundle written");

    Ok(WrittenBundle { path, words, pages })
}

fn output_stem(output: &Path) -> Result<String> {
    output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            SiteBundleError::validation(format!(
                "output path '{}' has no file name",
                output.display()
            ))
        })
}

fn manifest_path(output: &Path, stem: &str) -> PathBuf {
    let dir = output.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{stem}.manifest.json"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Write a serializable value as pretty-printed JSON.
fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| SiteBundleError::validation(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| SiteBundleError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
