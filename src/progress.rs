//! Progress-callback trait for batch, document and page events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the coordinator walks through documents and the worker pool finishes
//! pages. The CLI renders them with a progress bar; a library caller might
//! forward them to a channel or a database row.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2pptx::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     vectorized: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_page_vectorized(&self, _doc: &str, page_num: usize, total_pages: usize) {
//!         let done = self.vectorized.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("page {page_num}/{total_pages} ({done} so far)");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { vectorized: AtomicUsize::new(0) });
//! let config = BatchConfig::builder()
//!     .progress_callback(cb as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{BatchResult, DocumentReport};
use std::sync::Arc;

/// Called by the coordinator and the worker pool as work progresses.
///
/// Page events may arrive concurrently and out of page order because the
/// worker pool finishes pages in arbitrary order. All methods default to
/// no-ops so implementors override only what they need.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once with the number of documents about to be processed.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called after a document has been rasterized.
    ///
    /// * `doc_num` — 1-indexed position in the batch
    fn on_document_start(&self, doc: &str, doc_num: usize, total_pages: usize) {
        let _ = (doc, doc_num, total_pages);
    }

    /// Called when a page's markup was received and sanitized.
    fn on_page_vectorized(&self, doc: &str, page_num: usize, total_pages: usize) {
        let _ = (doc, page_num, total_pages);
    }

    /// Called when a page lands in a failed terminal state.
    fn on_page_failed(&self, doc: &str, page_num: usize, total_pages: usize, error: &str) {
        let _ = (doc, page_num, total_pages, error);
    }

    /// Called once per document with its final report.
    fn on_document_complete(&self, report: &DocumentReport) {
        let _ = report;
    }

    /// Called once after the last document.
    fn on_batch_complete(&self, result: &BatchResult) {
        let _ = result;
    }
}

/// No-op implementation, used when no callback is configured.
#[derive(Debug)]
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        vectorized: AtomicUsize,
        failed: AtomicUsize,
        documents: AtomicUsize,
    }

    impl BatchProgressCallback for Tracking {
        fn on_page_vectorized(&self, _doc: &str, _page_num: usize, _total_pages: usize) {
            self.vectorized.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_failed(&self, _doc: &str, _page_num: usize, _total: usize, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _report: &DocumentReport) {
            self.documents.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start("a", 1, 3);
        cb.on_page_vectorized("a", 1, 3);
        cb.on_page_failed("a", 2, 3, "timeout");
        cb.on_batch_complete(&BatchResult::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = Tracking::default();
        t.on_page_vectorized("a", 1, 2);
        t.on_page_failed("a", 2, 2, "503");
        t.on_document_complete(&DocumentReport::failed("a.pdf".into(), "x", 0));
        assert_eq!(t.vectorized.load(Ordering::SeqCst), 1);
        assert_eq!(t.failed.load(Ordering::SeqCst), 1);
        assert_eq!(t.documents.load(Ordering::SeqCst), 1);
    }
}
