//! In-memory model of a document and its pages as they move through the pipeline.

use crate::error::PageError;
use crate::retry::RetryState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where a page currently sits in the pipeline.
///
/// `VectorizeFailed` and `ConvertFailed` are terminal-skip states: the page
/// is left out of the deck but nothing else stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageStatus {
    Pending,
    Rasterized,
    Vectorized,
    VectorizeFailed,
    Sanitized,
    Converted,
    ConvertFailed,
    Assembled,
}

impl PageStatus {
    /// True for the two terminal-skip states.
    pub fn is_failed(self) -> bool {
        matches!(self, PageStatus::VectorizeFailed | PageStatus::ConvertFailed)
    }
}

/// One page of a source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 0-based position in the source document. Never changes.
    pub index: usize,
    pub status: PageStatus,
    /// Rendered PNG.
    pub raster: Option<PathBuf>,
    /// Response text exactly as the service returned it.
    #[serde(skip)]
    pub raw_markup: Option<String>,
    /// Extracted `<svg>` markup.
    #[serde(skip)]
    pub markup: Option<String>,
    /// Where the sanitized markup was written.
    pub markup_path: Option<PathBuf>,
    /// Converted artifact (EMF/PNG) ready for assembly.
    pub artifact: Option<PathBuf>,
    /// Vectorization retry bookkeeping.
    pub retry: RetryState,
    pub error: Option<PageError>,
}

impl Page {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            status: PageStatus::Pending,
            raster: None,
            raw_markup: None,
            markup: None,
            markup_path: None,
            artifact: None,
            retry: RetryState::default(),
            error: None,
        }
    }

    /// 1-based page number for logs and file names.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn fail(&mut self, status: PageStatus, error: PageError) {
        debug_assert!(status.is_failed());
        self.status = status;
        self.error = Some(error);
    }
}

/// Aggregate outcome of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Every page made it into the deck.
    Success,
    /// Some pages made it into the deck.
    Partial,
    /// Nothing was produced.
    Failed,
}

impl DocumentStatus {
    pub fn is_success(self) -> bool {
        !matches!(self, DocumentStatus::Failed)
    }
}

/// A source document and its pages.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: PathBuf,
    /// File stem used to name the work subtree and the output deck.
    pub stem: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let stem = document_stem(&source);
        Self {
            source,
            stem,
            pages: Vec::new(),
        }
    }

    /// A document whose work subtree and deck use `stem` instead of the
    /// file stem.
    pub fn with_stem(source: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            stem: stem.into(),
            pages: Vec::new(),
        }
    }

    /// Success iff at least one page was assembled.
    pub fn status(&self) -> DocumentStatus {
        let assembled = self.count(PageStatus::Assembled);
        if assembled == 0 {
            DocumentStatus::Failed
        } else if assembled == self.pages.len() {
            DocumentStatus::Success
        } else {
            DocumentStatus::Partial
        }
    }

    pub fn count(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }

    /// Output file name derived from the source name.
    pub fn output_file_name(&self) -> String {
        format!("{}_Editable.pptx", self.stem)
    }
}

/// File stem of `path`, with characters unsafe for directory names replaced.
pub fn document_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    if cleaned.trim().is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// One stem per source, unique within the batch.
///
/// Stems are compared case-insensitively. The first document keeps its
/// stem; later ones with the same stem get `_2`, `_3`, ...
pub fn unique_stems(sources: &[PathBuf]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    sources
        .iter()
        .map(|source| {
            let base = document_stem(source);
            let mut stem = base.clone();
            let mut n = 1;
            while !taken.insert(stem.to_lowercase()) {
                n += 1;
                stem = format!("{base}_{n}");
            }
            stem
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(statuses: &[PageStatus]) -> Document {
        let mut doc = Document::new("input/report.pdf");
        doc.pages = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut p = Page::new(i);
                p.status = *s;
                p
            })
            .collect();
        doc
    }

    #[test]
    fn status_success_when_all_assembled() {
        let doc = doc_with(&[PageStatus::Assembled, PageStatus::Assembled]);
        assert_eq!(doc.status(), DocumentStatus::Success);
    }

    #[test]
    fn status_partial_when_some_assembled() {
        let doc = doc_with(&[PageStatus::Assembled, PageStatus::ConvertFailed]);
        assert_eq!(doc.status(), DocumentStatus::Partial);
        assert!(doc.status().is_success());
    }

    #[test]
    fn status_failed_when_none_assembled() {
        let doc = doc_with(&[PageStatus::VectorizeFailed, PageStatus::ConvertFailed]);
        assert_eq!(doc.status(), DocumentStatus::Failed);
        assert_eq!(doc_with(&[]).status(), DocumentStatus::Failed);
    }

    #[test]
    fn output_name_is_deterministic() {
        let doc = Document::new("/tmp/in/Quarterly Charts.pdf");
        assert_eq!(doc.stem, "Quarterly Charts");
        assert_eq!(doc.output_file_name(), "Quarterly Charts_Editable.pptx");
    }

    #[test]
    fn stem_falls_back_for_odd_paths() {
        assert_eq!(document_stem(Path::new("/")), "document");
    }

    #[test]
    fn colliding_stems_get_suffixes() {
        let sources = [
            PathBuf::from("a/report.pdf"),
            PathBuf::from("b/report.pdf"),
            PathBuf::from("c/Report.PDF"),
            PathBuf::from("d/report_2.pdf"),
            PathBuf::from("summary.pdf"),
        ];
        assert_eq!(
            unique_stems(&sources),
            ["report", "report_2", "Report_3", "report_2_2", "summary"]
        );
    }

    #[test]
    fn page_numbers_are_one_based() {
        assert_eq!(Page::new(0).number(), 1);
        assert_eq!(Page::new(4).number(), 5);
    }

    #[test]
    fn page_status_serialises_screaming() {
        let json = serde_json::to_string(&PageStatus::VectorizeFailed).unwrap();
        assert_eq!(json, "\"VECTORIZE_FAILED\"");
    }
}
