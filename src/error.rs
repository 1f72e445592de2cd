//! Error types for the edgequake-pdf2pptx library.
//!
//! Three error types mirror the three failure scopes of a batch run:
//!
//! * [`BatchError`] — **Environment-fatal**: the batch cannot start at all
//!   (input directory missing, Inkscape not installed, provider not
//!   configured). Returned as `Err(BatchError)` from
//!   [`crate::batch::BatchCoordinator::run`] and reported once.
//!
//! * [`DocumentError`] — **Document-fatal**: one PDF could not be converted
//!   (corrupt file, wrong password, every page failed). The coordinator
//!   records it in the document's report and moves on to the next file.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed vectorization or
//!   conversion. Stored on the [`crate::document::Page`] so callers can see
//!   exactly which slides are missing and why.

use std::path::PathBuf;
use thiserror::Error;

/// Install hint shown whenever the conversion tool cannot be located.
pub const INKSCAPE_INSTALL_HINT: &str = "Install Inkscape and make sure `inkscape` is on PATH:\n\
  • macOS:   brew install --cask inkscape\n\
  • Debian:  sudo apt install inkscape\n\
  • Windows: winget install Inkscape.Inkscape\n\
Or point --inkscape at the binary.";

/// Errors that stop the whole batch before any document is processed.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input directory or file does not exist.
    #[error("Input location not found: '{path}'\nCreate it and place PDF files inside.")]
    InputNotFound { path: PathBuf },

    /// The input location could not be listed.
    #[error("Failed to read input location '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The work directory for intermediate files could not be created.
    #[error("Failed to prepare work directory: {0}")]
    WorkDirFailed(#[source] std::io::Error),

    /// The external conversion tool is not installed.
    #[error("Conversion tool '{tool}' was not found.\n{hint}")]
    ToolNotFound { tool: String, hint: String },

    /// The configured vision provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the executable or install it system-wide.\n\
Prebuilt binaries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that fail a single document without affecting the rest of the batch.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The document has no pages at all.
    #[error("PDF '{path}' contains no pages")]
    EmptyDocument { path: PathBuf },

    /// Every page ended in a failed state, so there is nothing to assemble.
    #[error("No page of {total} survived vectorization and conversion")]
    NoPagesAssembled { total: usize },

    /// Writing the assembled deck failed.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    /// Filesystem error on intermediate artifacts.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document pipeline panicked or was otherwise interrupted.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored on [`crate::document::Page`]; the page is left out of the deck
/// but every sibling page keeps going.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The vectorization service failed on every attempt.
    #[error("Page {page}: vectorization failed after {attempts} attempts: {detail}")]
    VectorizeFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// The service answered but no usable markup could be extracted.
    #[error("Page {page}: no usable SVG markup in response: {detail}")]
    SanitizeFailed { page: usize, detail: String },

    /// The conversion tool failed for this page.
    #[error("Page {page}: conversion failed: {detail}")]
    ConvertFailed { page: usize, detail: String },

    /// The page task panicked or vanished before reporting a result.
    #[error("Page {page}: worker aborted: {detail}")]
    WorkerAborted { page: usize, detail: String },
}

/// Why a single vectorization attempt failed. Every variant is retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VectorizeError {
    /// Network, provider or I/O failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service replied with an empty body.
    #[error("service returned an empty response")]
    EmptyResponse,

    /// The service replied with something that is not a completion.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The attempt exceeded the configured per-attempt timeout.
    #[error("attempt timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Failure of one invocation of the external conversion tool.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The tool could not be located.
    #[error("'{tool}' not found")]
    ToolMissing { tool: String },

    /// The process could not be started.
    #[error("failed to launch '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool exited with a nonzero status.
    #[error("'{tool}' exited with {status}: {stderr}")]
    NonZeroExit {
        tool: String,
        status: String,
        stderr: String,
    },

    /// The tool exited cleanly but left no usable output.
    #[error("no output produced at '{path}'")]
    MissingOutput { path: PathBuf },

    /// Filesystem error around the invocation.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_carries_hint() {
        let e = BatchError::ToolNotFound {
            tool: "inkscape".into(),
            hint: INKSCAPE_INSTALL_HINT.into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("inkscape"), "got: {msg}");
        assert!(msg.contains("brew install"), "got: {msg}");
    }

    #[test]
    fn vectorize_failed_display() {
        let e = PageError::VectorizeFailed {
            page: 3,
            attempts: 3,
            detail: "HTTP 503".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 3"));
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn no_pages_assembled_display() {
        let e = DocumentError::NoPagesAssembled { total: 4 };
        assert!(e.to_string().contains("4"));
    }

    #[test]
    fn non_zero_exit_display() {
        let e = ConvertError::NonZeroExit {
            tool: "inkscape".into(),
            status: "exit status: 1".into(),
            stderr: "parser error".into(),
        };
        assert!(e.to_string().contains("parser error"));
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::ConvertFailed {
            page: 2,
            detail: "boom".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("ConvertFailed"));
    }
}
