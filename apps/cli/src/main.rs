//! sitebundle CLI: render documentation sites into size-bounded PDF bundles.
//!
//! Pages come from a sitemap or a URL list. Each page is rendered to PDF,
//! measured in words, and grouped into bundles that break at section
//! boundaries when a bundle nears its word limit.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
