//! Bounded render retries.

use std::path::Path;
use std::time::Duration;

use sitebundle_shared::RunConfig;
use tracing::{info, warn};
use url::Url;

use crate::renderer::Renderer;

/// How many times a page is attempted, and the pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay: Duration::from_secs(2),
        }
    }
}

impl From<&RunConfig> for RetryPolicy {
    fn from(config: &RunConfig) -> Self {
        Self {
            attempts: config.attempts,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Result of rendering one page under a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The page was rendered; `attempts` counts the successful one.
    Rendered { attempts: u32 },
    /// Every attempt failed.
    Exhausted { attempts: u32, last_error: String },
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Rendered { attempts } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Render `url` to `out`, retrying up to `policy.attempts` times.
pub async fn render_with_retry<R: Renderer>(
    renderer: &R,
    url: &Url,
    out: &Path,
    policy: &RetryPolicy,
) -> RenderOutcome {
    let max = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max {
        match renderer.render(url, out).await {
            Ok(()) => {
                if attempt > 1 {
                    info!(%url, attempt, "page rendered after retry");
                }
                return RenderOutcome::Rendered { attempts: attempt };
            }
            Err(e) => {
                warn!(%url, attempt, max, error = %e, "render attempt failed");
                last_error = e.to_string();
                if attempt < max && !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    RenderOutcome::Exhausted {
        attempts: max,
        last_error,
    }
}
