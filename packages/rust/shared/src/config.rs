//! Application configuration for SiteBundle.
//!
//! User config lives at `~/.sitebundle/sitebundle.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteBundleError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitebundle.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitebundle";

// ---------------------------------------------------------------------------
// Config structs (matching sitebundle.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bundle sizing.
    #[serde(default)]
    pub bundle: BundleConfig,

    /// Page rendering.
    #[serde(default)]
    pub render: RenderConfig,

    /// External PDF tools.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Page discovery.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// `[bundle]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Target number of words per output bundle.
    #[serde(default = "default_word_limit")]
    pub word_limit: u64,

    /// Fractional width of the soft zone around `word_limit`.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            word_limit: default_word_limit(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_word_limit() -> u64 {
    100_000
}
fn default_tolerance() -> f64 {
    0.2
}

/// Headless renderer used to print pages to PDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackend {
    /// Chromium / Chrome in headless mode (`--print-to-pdf`).
    #[default]
    Chromium,
    /// The `wkhtmltopdf` tool.
    Wkhtmltopdf,
}

impl RenderBackend {
    /// Executable name looked up on `PATH` when no override is configured.
    pub fn default_binary(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Wkhtmltopdf => "wkhtmltopdf",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Wkhtmltopdf => "wkhtmltopdf",
        }
    }
}

impl std::fmt::Display for RenderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RenderBackend {
    type Err = SiteBundleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Self::Chromium),
            "wkhtmltopdf" => Ok(Self::Wkhtmltopdf),
            other => Err(SiteBundleError::config(format!(
                "unknown render backend '{other}': expected 'chromium' or 'wkhtmltopdf'"
            ))),
        }
    }
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Which renderer to drive.
    #[serde(default)]
    pub backend: RenderBackend,

    /// Explicit path to the renderer executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,

    /// Attempts per page before giving up on it.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Pause between attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Pages rendered at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: RenderBackend::default(),
            binary: None,
            timeout_secs: default_render_timeout(),
            attempts: default_attempts(),
            retry_delay_ms: default_retry_delay(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_render_timeout() -> u64 {
    60
}
fn default_attempts() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    2000
}
fn default_concurrency() -> u32 {
    4
}

/// `[tools]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Text extractor used for word counting.
    #[serde(default = "default_pdftotext")]
    pub pdftotext: String,

    /// PDF concatenation tool.
    #[serde(default = "default_pdfunite")]
    pub pdfunite: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pdftotext: default_pdftotext(),
            pdfunite: default_pdfunite(),
        }
    }
}

fn default_pdftotext() -> String {
    "pdftotext".into()
}
fn default_pdfunite() -> String {
    "pdfunite".into()
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Timeout for sitemap requests.
    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,

    /// URL path include patterns.
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// URL path exclude patterns.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Drop URLs whose second path segment is a number (paginated/archived pages).
    #[serde(default)]
    pub skip_numeric_segments: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_discovery_timeout(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            skip_numeric_segments: false,
        }
    }
}

fn default_discovery_timeout() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one `bundle` run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub word_limit: u64,
    pub tolerance: f64,
    pub backend: RenderBackend,
    pub render_binary: Option<String>,
    pub render_timeout_secs: u64,
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub concurrency: u32,
    pub pdftotext: String,
    pub pdfunite: String,
    pub discovery_timeout_secs: u64,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub skip_numeric_segments: bool,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            word_limit: config.bundle.word_limit,
            tolerance: config.bundle.tolerance,
            backend: config.render.backend,
            render_binary: config.render.binary.clone(),
            render_timeout_secs: config.render.timeout_secs,
            attempts: config.render.attempts,
            retry_delay_ms: config.render.retry_delay_ms,
            concurrency: config.render.concurrency,
            pdftotext: config.tools.pdftotext.clone(),
            pdfunite: config.tools.pdfunite.clone(),
            discovery_timeout_secs: config.discovery.timeout_secs,
            include_patterns: config.discovery.include_patterns.clone(),
            exclude_patterns: config.discovery.exclude_patterns.clone(),
            skip_numeric_segments: config.discovery.skip_numeric_segments,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitebundle/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteBundleError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitebundle/sitebundle.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteBundleError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteBundleError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteBundleError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteBundleError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteBundleError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
