//! Pipeline stages for PDF-to-PPTX conversion.
//!
//! Each submodule implements one transformation step, so each can be tested
//! on its own and swapped behind its trait seam.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ sanitize ──▶ export ──▶ assemble
//! (dir)    (pdfium)   (base64)   (VLM)   (<svg>)     (Inkscape)   (PPTX)
//! ```
//!
//! 1. [`input`]    — discover the PDFs to process
//! 2. [`render`]   — rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]   — base64-wrap each PNG for the multimodal request body
//! 4. [`llm`]      — vision call with retry/backoff; the only stage with
//!    network I/O
//! 5. [`sanitize`] — extract the `<svg>` document from the model's reply
//! 6. [`export`]   — SVG → EMF/PNG through the Inkscape CLI
//! 7. [`assemble`] — one picture per slide in a PPTX package
//!
//! [`pool`] runs stages 3–5 for all pages of a document with bounded
//! concurrency.

pub mod assemble;
pub mod encode;
pub mod export;
pub mod input;
pub mod llm;
pub mod pool;
pub mod render;
pub mod sanitize;
