//! Core bundling logic and pipeline orchestration for sitebundle.
//!
//! The bundler itself is pure: [`bundle`] groups measured items in order,
//! using [`differs`] to decide soft-zone breaks. [`pipeline::run_bundle`]
//! drives it end to end over discovery, rendering, and merging.

pub mod bundler;
pub mod pipeline;
pub mod structure;

pub use bundler::{BundleParams, DEFAULT_TOLERANCE, DEFAULT_WORD_LIMIT, Group, Item, bundle};
pub use pipeline::{
    BundleJob, BundleRunResult, Collaborators, FailedPage, ProgressReporter, SilentProgress,
    WorkDir, WrittenBundle, output_paths, run_bundle,
};
pub use structure::{StructuralPath, differs, structure_of};
