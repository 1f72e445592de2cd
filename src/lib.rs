//! # edgequake-pdf2pptx
//!
//! Turn PDF pages into editable PowerPoint slides using Vision Language Models.
//!
//! Each page is rasterised, redrawn as SVG by a vision model, converted to
//! EMF with Inkscape, and placed on its own slide. Charts and diagrams come
//! out as vector shapes that can be ungrouped and edited in PowerPoint,
//! rather than as a flat screenshot.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input/*.pdf
//!  │
//!  ├─ 1. Render     rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 2. Vectorize  concurrent vision-LLM calls with retry/backoff
//!  ├─ 3. Sanitize   extract <svg>…</svg> from the reply
//!  ├─ 4. Convert    SVG → EMF via Inkscape, one page at a time
//!  └─ 5. Assemble   one slide per page → output/<name>_Editable.pptx
//! ```
//!
//! A failed page is left out of the deck; a failed document is reported and
//! the batch continues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2pptx::{BatchConfig, BatchCoordinator, BatchOutcome};
//! use std::path::{Path, PathBuf};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider from OPENROUTER_API_KEY, else auto-detected
//!     let config = BatchConfig::builder().concurrency(3).build()?;
//!     let coordinator = BatchCoordinator::new(config)?;
//!     match coordinator.run(&[PathBuf::from("input")], Path::new("output")).await? {
//!         BatchOutcome::NoInput { searched } => eprintln!("no PDFs in {}", searched.display()),
//!         BatchOutcome::Completed(result) => {
//!             eprintln!("{}/{} documents converted", result.succeeded, result.attempted)
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2pptx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External Tools
//!
//! * **pdfium** — next to the executable or installed system-wide
//! * **Inkscape** — on PATH, in the default macOS location, or passed with `--inkscape`

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod retry;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::BatchCoordinator;
pub use config::{BatchConfig, BatchConfigBuilder, Canvas, ExportFormat, DEFAULT_MODEL};
pub use convert::DocumentPipeline;
pub use document::{Document, DocumentStatus, Page, PageStatus};
pub use error::{BatchError, ConvertError, DocumentError, PageError, VectorizeError};
pub use output::{BatchOutcome, BatchResult, DocumentReport, PageReport};
pub use pipeline::export::{FormatConverter, InkscapeConverter};
pub use pipeline::llm::{LlmVectorizer, VectorizationService};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use retry::{retry_with_backoff, RetryState};
