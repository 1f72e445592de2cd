//! Result types reported back to the caller after a batch run.

use crate::document::{Document, DocumentStatus, Page, PageStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-page summary kept in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based page number.
    pub page_num: usize,
    pub status: PageStatus,
    /// Vectorization attempts made for this page.
    pub attempts: u32,
    pub error: Option<String>,
}

impl From<&Page> for PageReport {
    fn from(page: &Page) -> Self {
        Self {
            page_num: page.number(),
            status: page.status,
            attempts: page.retry.attempts,
            error: page.error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Outcome of one document in the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub status: DocumentStatus,
    /// Written deck, if any page survived.
    pub output: Option<PathBuf>,
    /// Pages rasterized (the pages attempted).
    pub total_pages: usize,
    /// Pages that came back from the service with usable markup.
    pub vectorized_pages: usize,
    /// Pages placed in the deck.
    pub assembled_pages: usize,
    pub duration_ms: u64,
    pub pages: Vec<PageReport>,
    /// Document-level failure, when the document failed outright.
    pub error: Option<String>,
}

impl DocumentReport {
    /// Build the report for a document that went through the pipeline.
    pub fn from_document(doc: &Document, output: Option<PathBuf>, duration_ms: u64) -> Self {
        let vectorized_pages = doc
            .pages
            .iter()
            .filter(|p| {
                !matches!(
                    p.status,
                    PageStatus::Pending | PageStatus::Rasterized | PageStatus::VectorizeFailed
                )
            })
            .count();
        Self {
            source: doc.source.clone(),
            status: doc.status(),
            output,
            total_pages: doc.pages.len(),
            vectorized_pages,
            assembled_pages: doc.count(PageStatus::Assembled),
            duration_ms,
            pages: doc.pages.iter().map(PageReport::from).collect(),
            error: None,
        }
    }

    /// Report for a document that failed before or outside page processing.
    pub fn failed(source: PathBuf, error: impl ToString, duration_ms: u64) -> Self {
        Self {
            source,
            status: DocumentStatus::Failed,
            output: None,
            total_pages: 0,
            vectorized_pages: 0,
            assembled_pages: 0,
            duration_ms,
            pages: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Summary of a completed batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub documents: Vec<DocumentReport>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl BatchResult {
    pub fn record(&mut self, report: DocumentReport) {
        self.attempted += 1;
        if report.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.documents.push(report);
    }
}

/// How a batch ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// The input location held no eligible documents; nothing was done.
    NoInput { searched: PathBuf },
    /// Every discovered document was attempted.
    Completed(BatchResult),
}
