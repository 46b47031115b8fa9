//! Concatenation of rendered documents into one output file.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sitebundle_shared::{Result, SiteBundleError};
use tracing::{debug, instrument};

use crate::process::ToolCommand;

/// Default timeout for one merge call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Merges an ordered list of documents into `out`.
pub trait Merger: Send + Sync {
    fn merge(&self, inputs: &[PathBuf], out: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// [`Merger`] that runs `pdfunite <in>... <out>`.
#[derive(Debug, Clone)]
pub struct PdfUniteMerger {
    command: ToolCommand,
    timeout: Duration,
}

impl PdfUniteMerger {
    pub fn new(command: ToolCommand) -> Self {
        Self {
            command,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Merger for PdfUniteMerger {
    #[instrument(skip_all, fields(inputs = inputs.len(), out = %out.display()))]
    async fn merge(&self, inputs: &[PathBuf], out: &Path) -> Result<()> {
        match inputs {
            [] => Err(SiteBundleError::validation("nothing to merge")),
            [single] => {
                tokio::fs::copy(single, out)
                    .await
                    .map_err(|e| SiteBundleError::io(out, e))?;
                debug!("single document copied");
                Ok(())
            }
            _ => {
                let mut args: Vec<OsString> =
                    inputs.iter().map(|p| p.as_os_str().to_owned()).collect();
                args.push(out.as_os_str().to_owned());

                self.command
                    .run(&args, self.timeout)
                    .await
                    .map_err(|e| SiteBundleError::Merge(format!("{}: {e}", out.display())))?;

                if !tokio::fs::try_exists(out).await.unwrap_or(false) {
                    return Err(SiteBundleError::Merge(format!(
                        "{}: merge tool produced no output",
                        out.display()
                    )));
                }
                debug!("documents merged");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let merger = PdfUniteMerger::new(ToolCommand::parse("pdfunite").unwrap());
        let err = merger.merge(&[], Path::new("out.pdf")).await.unwrap_err();
        assert!(matches!(err, SiteBundleError::Validation { .. }));
    }

    #[tokio::test]
    async fn single_input_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.pdf", "AAA");
        let out = dir.path().join("out.pdf");

        // The tool must not be needed for one input.
        let merger = PdfUniteMerger::new(ToolCommand::parse("sitebundle-no-such-tool").unwrap());
        merger.merge(&[a], &out).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "AAA");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn multiple_inputs_run_the_tool_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.pdf", "A");
        let b = write(dir.path(), "b.pdf", "B");
        let c = write(dir.path(), "c.pdf", "C");
        // Concatenate every argument but the last into the last.
        let script = write(
            dir.path(),
            "fake-unite.sh",
            "for last; do :; done\n: > \"$last\"\nfor f; do [ \"$f\" = \"$last\" ] || cat \"$f\" >> \"$last\"; done\n",
        );

        let merger =
            PdfUniteMerger::new(ToolCommand::parse(&format!("sh {}", script.display())).unwrap())
                .with_timeout(Duration::from_secs(5));
        let out = dir.path().join("out.pdf");
        merger.merge(&[b, a, c], &out).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "BAC");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_failure_is_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.pdf", "A");
        let b = write(dir.path(), "b.pdf", "B");

        let merger = PdfUniteMerger::new(ToolCommand::parse("false").unwrap());
        let err = merger
            .merge(&[a, b], &dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteBundleError::Merge(_)));
    }
}
