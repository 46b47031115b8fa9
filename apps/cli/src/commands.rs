//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use sitebundle_core::{
    BundleJob, BundleParams, BundleRunResult, Collaborators, ProgressReporter, WrittenBundle,
    run_bundle,
};
use sitebundle_discovery::{DiscoveryOptions, Section};
use sitebundle_render::{PdfTextCounter, PdfUniteMerger, ProcessRenderer, RetryPolicy, ToolCommand};
use sitebundle_shared::{AppConfig, RenderBackend, RunConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// sitebundle: turn a documentation site into a few well-cut PDFs.
#[derive(Parser)]
#[command(
    name = "sitebundle",
    version,
    about = "Render documentation pages to PDF and bundle them by size and site structure.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render pages and write them as one or more bundled PDFs.
    Bundle(BundleArgs),

    /// Split a sitemap into one URL list per top-level site section.
    Sections {
        /// Sitemap URL to split.
        sitemap: String,

        /// Directory for the generated lists.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Prefix prepended to each list file name.
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `sitebundle bundle`. Flags override the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct BundleArgs {
    /// Sitemap URL or path to a URL list file.
    pub input: String,

    /// Output PDF. Several bundles are written as `<stem>_<n>.pdf`.
    pub output: PathBuf,

    /// Target words per bundle.
    #[arg(long)]
    pub word_limit: Option<u64>,

    /// Soft-zone tolerance around the word limit, in [0, 1).
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Render backend: chromium or wkhtmltopdf.
    #[arg(long)]
    pub backend: Option<RenderBackend>,

    /// Render attempts per page.
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Pages rendered at the same time.
    #[arg(long)]
    pub concurrency: Option<u32>,

    /// Only keep pages whose path matches (repeatable).
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Drop pages whose path matches (repeatable).
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Print the pages included in each bundle.
    #[arg(long)]
    pub list_pages: bool,
}

impl BundleArgs {
    /// Overlay the flags that were given onto `config`.
    fn apply(&self, config: &mut RunConfig) {
        if let Some(limit) = self.word_limit {
            config.word_limit = limit;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
            // A binary configured for another backend would get the wrong flags.
            config.render_binary = None;
        }
        if let Some(attempts) = self.attempts {
            config.attempts = attempts;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if !self.include.is_empty() {
            config.include_patterns = self.include.clone();
        }
        if !self.exclude.is_empty() {
            config.exclude_patterns = self.exclude.clone();
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitebundle=info",
        1 => "sitebundle=debug",
        _ => "sitebundle=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Bundle(args) => cmd_bundle(&args).await,
        Command::Sections {
            sitemap,
            out_dir,
            prefix,
        } => cmd_sections(&sitemap, &out_dir, &prefix).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_bundle(args: &BundleArgs) -> Result<()> {
    let mut config = RunConfig::from(&load_config()?);
    args.apply(&mut config);

    let params = BundleParams::new(config.word_limit, config.tolerance)?;
    let renderer = ProcessRenderer::from_config(&config)?;
    let counter = PdfTextCounter::new(ToolCommand::parse(&config.pdftotext)?);
    let merger = PdfUniteMerger::new(ToolCommand::parse(&config.pdfunite)?);
    let collaborators = Collaborators::new(renderer, counter, merger);

    let job = BundleJob {
        input: args.input.clone(),
        discovery: DiscoveryOptions::from(&config),
        output: args.output.clone(),
        params,
        retry: RetryPolicy::from(&config),
        concurrency: config.concurrency as usize,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        input = %job.input,
        output = %job.output.display(),
        word_limit = config.word_limit,
        tolerance = config.tolerance,
        backend = %config.backend,
        "bundling pages"
    );

    let reporter = CliProgress::new();
    let result = run_bundle(&job, &collaborators, &reporter).await?;

    print_summary(&result, args.list_pages);
    Ok(())
}

fn print_summary(result: &BundleRunResult, list_pages: bool) {
    println!();
    println!("  Bundles written: {}", result.bundles.len());
    for bundle in &result.bundles {
        println!(
            "  {}  ({} words, {} pages)",
            bundle.path.display(),
            bundle.words,
            bundle.pages.len()
        );
        if list_pages {
            for page in &bundle.pages {
                println!("      {page}");
            }
        }
    }
    if !result.failed.is_empty() {
        println!();
        println!("  Skipped {} of {} pages:", result.failed.len(), result.source_pages);
        for page in &result.failed {
            println!("      {}  ({})", page.url, page.reason);
        }
    }
    println!();
    println!("  Manifest: {}", result.manifest_path.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

async fn cmd_sections(sitemap: &str, out_dir: &Path, prefix: &str) -> Result<()> {
    let config = RunConfig::from(&load_config()?);
    let opts = DiscoveryOptions::from(&config);

    let sitemap_url = Url::parse(sitemap).map_err(|e| eyre!("invalid URL '{sitemap}': {e}"))?;
    let urls = sitebundle_discovery::fetch_sitemap(&sitemap_url, &opts).await?;
    let sections = sitebundle_discovery::split_by_section(&urls);
    if sections.is_empty() {
        return Err(eyre!("no sections found in {sitemap}"));
    }

    std::fs::create_dir_all(out_dir)
        .map_err(|e| eyre!("cannot create '{}': {e}", out_dir.display()))?;

    let today = Local::now().date_naive();
    for section in &sections {
        let path = out_dir.join(section_file_name(prefix, &section.name, today));
        std::fs::write(&path, section_list(section))
            .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
        info!(section = %section.name, urls = section.urls.len(), path = %path.display(), "section list written");
        println!("  {}  ({} URLs)", path.display(), section.urls.len());
    }

    Ok(())
}

/// `<prefix><section>_urls_<mmddyy>.txt`
fn section_file_name(prefix: &str, section: &str, date: NaiveDate) -> String {
    format!("{prefix}{section}_urls_{}.txt", date.format("%m%d%y"))
}

fn section_list(section: &Section) -> String {
    let mut out = String::new();
    for url in &section.urls {
        out.push_str(url.as_str());
        out.push('\n');
    }
    out
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_rendered(&self, url: &str, words: u64, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Rendered [{current}/{total}] {url} ({words} words)"));
    }

    fn page_failed(&self, url: &str, _reason: &str, current: usize, total: usize) {
        self.spinner
            .println(format!("  skipped [{current}/{total}] {url}"));
    }

    fn bundle_written(&self, bundle: &WrittenBundle) {
        self.spinner
            .set_message(format!("Wrote {}", bundle.path.display()));
    }

    fn done(&self, _result: &BundleRunResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_config() -> RunConfig {
        RunConfig::from(&AppConfig::default())
    }

    #[test]
    fn parses_bundle_flags() {
        let cli = Cli::try_parse_from([
            "sitebundle",
            "bundle",
            "pages.txt",
            "out/docs.pdf",
            "--word-limit",
            "5000",
            "--backend",
            "wkhtmltopdf",
            "--include",
            "/docs/**",
            "--include",
            "/guides/**",
            "--list-pages",
        ])
        .unwrap();

        let Command::Bundle(args) = cli.command else {
            panic!("expected bundle command");
        };
        assert_eq!(args.input, "pages.txt");
        assert_eq!(args.output, PathBuf::from("out/docs.pdf"));
        assert_eq!(args.word_limit, Some(5000));
        assert_eq!(args.backend, Some(RenderBackend::Wkhtmltopdf));
        assert_eq!(args.include, vec!["/docs/**", "/guides/**"]);
        assert!(args.list_pages);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let parsed = Cli::try_parse_from(["sitebundle", "bundle", "a.txt", "b.pdf", "--backend", "prince"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut config = run_config();
        config.render_binary = Some("/opt/chrome/chrome".into());
        config.exclude_patterns = vec!["/blog/**".into()];

        let args = BundleArgs {
            word_limit: Some(2000),
            tolerance: Some(0.1),
            backend: Some(RenderBackend::Wkhtmltopdf),
            concurrency: Some(8),
            include: vec!["/docs/**".into()],
            ..BundleArgs::default()
        };
        args.apply(&mut config);

        assert_eq!(config.word_limit, 2000);
        assert_eq!(config.tolerance, 0.1);
        assert_eq!(config.backend, RenderBackend::Wkhtmltopdf);
        assert_eq!(config.render_binary, None);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.include_patterns, vec!["/docs/**"]);
        assert_eq!(config.exclude_patterns, vec!["/blog/**"]);
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = run_config();
        let before = config.clone();
        BundleArgs::default().apply(&mut config);

        assert_eq!(config.word_limit, before.word_limit);
        assert_eq!(config.attempts, before.attempts);
        assert_eq!(config.backend, before.backend);
    }

    #[test]
    fn section_files_are_dated() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            section_file_name("", "guides", date),
            "guides_urls_030724.txt"
        );
        assert_eq!(
            section_file_name("torizon_", "api", date),
            "torizon_api_urls_030724.txt"
        );
    }

    #[test]
    fn section_list_has_one_url_per_line() {
        let section = Section {
            name: "guides".into(),
            urls: vec![
                Url::parse("https://docs.example.com/guides/a").unwrap(),
                Url::parse("https://docs.example.com/guides/b").unwrap(),
            ],
        };
        assert_eq!(
            section_list(&section),
            "https://docs.example.com/guides/a\nhttps://docs.example.com/guides/b\n"
        );
    }

    #[test]
    fn section_list_is_readable_as_url_list() {
        let dir = tempfile::tempdir().unwrap();
        let section = Section {
            name: "guides".into(),
            urls: vec![Url::parse("https://docs.example.com/guides/a?x=1&y=2").unwrap()],
        };
        let path = dir.path().join("guides.txt");
        std::fs::write(&path, section_list(&section)).unwrap();

        let urls = sitebundle_discovery::read_url_list(&path).unwrap();
        assert_eq!(urls, section.urls);
    }
}
