//! External tool invocation.

use std::ffi::OsString;
use std::process::{Output, Stdio};
use std::time::Duration;

use sitebundle_shared::{Result, SiteBundleError};
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 400;

/// A configured external command: a program plus leading arguments.
///
/// Parsed from a whitespace-separated string so wrappers work as-is, e.g.
/// `xvfb-run wkhtmltopdf` or `flatpak run org.chromium.Chromium`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    leading_args: Vec<String>,
}

impl ToolCommand {
    /// Parse a command string. Fails on an empty string.
    pub fn parse(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| SiteBundleError::config("tool command is empty"))?;

        Ok(Self {
            program,
            leading_args: parts.collect(),
        })
    }

    /// The executable that is spawned.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the command with `args` appended, failing on timeout or a
    /// non-zero exit status.
    pub(crate) async fn run(&self, args: &[OsString], timeout: Duration) -> Result<Output> {
        debug!(program = %self.program, args = args.len(), "running tool");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SiteBundleError::Process(format!(
                    "failed to spawn `{}`: {e}. Is it installed?",
                    self.program
                )));
            }
            Err(_) => {
                return Err(SiteBundleError::Process(format!(
                    "`{}` timed out after {:.1}s",
                    self.program,
                    timeout.as_secs_f64()
                )));
            }
        };

        if !output.status.success() {
            return Err(SiteBundleError::Process(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr_excerpt(&output.stderr)
            )));
        }

        Ok(output)
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.leading_args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
