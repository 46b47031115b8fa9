//! Page rendering through a headless browser process.

use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use sitebundle_shared::{RenderBackend, Result, RunConfig, SiteBundleError};
use tracing::{debug, instrument};
use url::Url;

use crate::process::ToolCommand;

/// Print margin applied on every side (wkhtmltopdf only).
const PAGE_MARGIN: &str = "10mm";

/// Turns a page URL into a fixed-layout document on disk.
pub trait Renderer: Send + Sync {
    /// Render `url` into the file at `out`, replacing it if present.
    fn render(&self, url: &Url, out: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// [`Renderer`] backed by a headless browser executable.
#[derive(Debug, Clone)]
pub struct ProcessRenderer {
    backend: RenderBackend,
    command: ToolCommand,
    timeout: Duration,
}

impl ProcessRenderer {
    pub fn new(backend: RenderBackend, command: ToolCommand, timeout: Duration) -> Self {
        Self {
            backend,
            command,
            timeout,
        }
    }

    /// Build from the run config, falling back to the backend's default binary.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let binary = config
            .render_binary
            .as_deref()
            .unwrap_or(config.backend.default_binary());

        Ok(Self::new(
            config.backend,
            ToolCommand::parse(binary)?,
            Duration::from_secs(config.render_timeout_secs),
        ))
    }

    pub fn backend(&self) -> RenderBackend {
        self.backend
    }
}

impl Renderer for ProcessRenderer {
    #[instrument(skip_all, fields(url = %url, backend = %self.backend))]
    async fn render(&self, url: &Url, out: &Path) -> Result<()> {
        let args = backend_args(self.backend, url, out);

        self.command
            .run(&args, self.timeout)
            .await
            .map_err(|e| SiteBundleError::Render(format!("{url}: {e}")))?;

        // Browsers sometimes exit 0 without writing anything (e.g. on a
        // navigation error page they refuse to print).
        let len = tokio::fs::metadata(out)
            .await
            .map(|m| m.len())
            .map_err(|e| SiteBundleError::Render(format!("{url}: no output produced: {e}")))?;
        if len == 0 {
            return Err(SiteBundleError::Render(format!("{url}: empty output")));
        }

        debug!(bytes = len, "page rendered");
        Ok(())
    }
}

/// Command-line arguments for one render call.
fn backend_args(backend: RenderBackend, url: &Url, out: &Path) -> Vec<OsString> {
    match backend {
        RenderBackend::Chromium => {
            let mut print_to = OsString::from("--print-to-pdf=");
            print_to.push(out.as_os_str());
            vec![
                "--headless".into(),
                "--disable-gpu".into(),
                "--no-sandbox".into(),
                "--hide-scrollbars".into(),
                "--run-all-compositor-stages-before-draw".into(),
                // let network-idle pages settle before printing
                "--virtual-time-budget=10000".into(),
                print_to,
                url.as_str().into(),
            ]
        }
        RenderBackend::Wkhtmltopdf => {
            let mut args: Vec<OsString> = vec!["--quiet".into(), "--page-size".into(), "A4".into()];
            for side in ["--margin-top", "--margin-right", "--margin-bottom", "--margin-left"] {
                args.push(side.into());
                args.push(PAGE_MARGIN.into());
            }
            args.extend([
                "--background".into(),
                "--header-left".into(),
                "[webpage]".into(),
                "--footer-center".into(),
                "[page]/[topage]".into(),
                url.as_str().into(),
                out.as_os_str().to_owned(),
            ]);
            args
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://docs.example.com/guide/intro").unwrap()
    }

    #[test]
    fn chromium_args_end_with_url() {
        let args = backend_args(RenderBackend::Chromium, &url(), Path::new("/tmp/p.pdf"));
        assert_eq!(args.last().unwrap(), "https://docs.example.com/guide/intro");
        assert!(args.contains(&OsString::from("--print-to-pdf=/tmp/p.pdf")));
        assert!(args.contains(&OsString::from("--headless")));
    }

    #[test]
    fn wkhtmltopdf_args_end_with_output() {
        let args = backend_args(RenderBackend::Wkhtmltopdf, &url(), Path::new("/tmp/p.pdf"));
        let n = args.len();
        assert_eq!(args[n - 1], "/tmp/p.pdf");
        assert_eq!(args[n - 2], "https://docs.example.com/guide/intro");
        assert!(args.windows(2).any(|w| w[0] == "--page-size" && w[1] == "A4"));
        assert_eq!(args.iter().filter(|a| *a == PAGE_MARGIN).count(), 4);
    }

    #[test]
    fn from_config_uses_default_binary() {
        let mut config = RunConfig::from(&sitebundle_shared::AppConfig::default());
        let renderer = ProcessRenderer::from_config(&config).unwrap();
        assert_eq!(renderer.command.program(), "chromium");
        assert_eq!(renderer.timeout, Duration::from_secs(60));

        config.backend = RenderBackend::Wkhtmltopdf;
        config.render_binary = Some("xvfb-run wkhtmltopdf".into());
        let renderer = ProcessRenderer::from_config(&config).unwrap();
        assert_eq!(renderer.backend(), RenderBackend::Wkhtmltopdf);
        assert_eq!(renderer.command.program(), "xvfb-run");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn renders_through_fake_tool() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-wk.sh");
        // The output path is the last argument.
        std::fs::write(&script, "for last; do :; done\nprintf '%%PDF-1.4 fake' > \"$last\"\n")
            .unwrap();

        let command = ToolCommand::parse(&format!("sh {}", script.display())).unwrap();
        let renderer =
            ProcessRenderer::new(RenderBackend::Wkhtmltopdf, command, Duration::from_secs(5));

        let out = dir.path().join("page_0.pdf");
        renderer.render(&url(), &out).await.unwrap();
        assert!(std::fs::read_to_string(&out).unwrap().starts_with("%PDF"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let command = ToolCommand::parse("true").unwrap();
        let renderer =
            ProcessRenderer::new(RenderBackend::Wkhtmltopdf, command, Duration::from_secs(5));

        let err = renderer
            .render(&url(), &dir.path().join("never.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteBundleError::Render(_)));
        assert!(err.to_string().contains("no output produced"));
    }
}
