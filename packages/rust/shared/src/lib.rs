//! Shared types, error model, and configuration for SiteBundle.
//!
//! This crate is the foundation depended on by all other SiteBundle crates.
//! It provides:
//! - [`SiteBundleError`]: the unified error type
//! - Domain types ([`BundleManifest`], [`BundleEntry`], [`RunId`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BundleConfig, DiscoveryConfig, RenderBackend, RenderConfig, RunConfig,
    ToolsConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, SiteBundleError};
pub use types::{BundleEntry, BundleManifest, CURRENT_SCHEMA_VERSION, RunId};
