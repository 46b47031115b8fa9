//! Rendering, measurement, and merging collaborators.
//!
//! Each concern sits behind a small trait so the pipeline can be driven with
//! real external tools or with in-memory fakes:
//! - [`Renderer`] / [`ProcessRenderer`]: URL to PDF via a headless browser
//! - [`render_with_retry`]: bounded retries with an explicit [`RenderOutcome`]
//! - [`WordCounter`] / [`PdfTextCounter`]: words in a rendered PDF
//! - [`Merger`] / [`PdfUniteMerger`]: ordered PDFs into one output file

pub mod measure;
pub mod merge;
pub mod process;
pub mod renderer;
pub mod retry;

pub use measure::{PdfTextCounter, WordCounter, count_words};
pub use merge::{Merger, PdfUniteMerger};
pub use process::ToolCommand;
pub use renderer::{ProcessRenderer, Renderer};
pub use retry::{RenderOutcome, RetryPolicy, render_with_retry};
