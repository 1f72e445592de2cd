//! Batch coordinator: discover documents, run each through the pipeline,
//! and tally the results.
//!
//! Documents are processed one at a time. A document that errors or panics
//! is recorded as failed and the batch moves on; only environment problems
//! (missing input, missing conversion tool, unwritable output) stop a batch,
//! and those are reported before the first document starts.

use crate::config::BatchConfig;
use crate::convert::DocumentPipeline;
use crate::document::{document_stem, unique_stems, Document};
use crate::error::BatchError;
use crate::output::{BatchOutcome, BatchResult, DocumentReport};
use crate::pipeline::export::{FormatConverter, InkscapeConverter};
use crate::pipeline::input;
use crate::pipeline::llm::{resolve_provider, LlmVectorizer, VectorizationService};
use crate::pipeline::pool::panic_message;
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Drives a batch of documents through a [`DocumentPipeline`].
pub struct BatchCoordinator {
    config: BatchConfig,
    pipeline: DocumentPipeline,
    progress: ProgressCallback,
}

impl BatchCoordinator {
    /// Build the production coordinator: pdfium rasterizer, vision-LLM
    /// vectorizer and Inkscape converter.
    ///
    /// # Errors
    /// [`BatchError::PdfiumBindingFailed`] when no pdfium library can be
    /// bound, [`BatchError::ProviderNotConfigured`] when no vision provider
    /// can be resolved.
    pub fn new(config: BatchConfig) -> Result<Self, BatchError> {
        let rasterizer = Arc::new(PdfiumRasterizer::new(&config)?);
        let provider = resolve_provider(&config)?;
        info!("Vision model: {}", config.model);
        let service = Arc::new(LlmVectorizer::new(provider, &config));
        let converter = Arc::new(InkscapeConverter::new(&config));
        Ok(Self::with_components(config, rasterizer, service, converter))
    }

    /// Build a coordinator around caller-supplied stages.
    pub fn with_components(
        config: BatchConfig,
        rasterizer: Arc<dyn Rasterizer>,
        service: Arc<dyn VectorizationService>,
        converter: Arc<dyn FormatConverter>,
    ) -> Self {
        let pipeline = DocumentPipeline::new(&config, rasterizer, service, converter);
        let progress = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback) as ProgressCallback);
        Self {
            config,
            pipeline,
            progress,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Convert every PDF found in `inputs` (directories or files) into a
    /// deck under `output_dir`.
    ///
    /// Returns [`BatchOutcome::NoInput`] without touching `output_dir` when
    /// there is nothing to do.
    pub async fn run(&self, inputs: &[PathBuf], output_dir: &Path) -> Result<BatchOutcome, BatchError> {
        let started = Instant::now();

        let documents = input::resolve_inputs(inputs)?;
        if documents.is_empty() {
            let searched = inputs.first().cloned().unwrap_or_default();
            warn!("No input found in {}", searched.display());
            return Ok(BatchOutcome::NoInput { searched });
        }

        // ── Preflight ────────────────────────────────────────────────────────
        self.pipeline.converter().probe()?;

        std::fs::create_dir_all(output_dir).map_err(|e| BatchError::OutputDirFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        // Held until the end of the batch; dropping it removes the directory.
        let (work_root, _temp_guard) = match &self.config.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(BatchError::WorkDirFailed)?;
                (dir.clone(), None)
            }
            None => {
                let tmp = tempfile::Builder::new()
                    .prefix("pdf2pptx-")
                    .tempdir()
                    .map_err(BatchError::WorkDirFailed)?;
                (tmp.path().to_path_buf(), Some(tmp))
            }
        };

        info!(
            "Processing {} document(s) → {}",
            documents.len(),
            output_dir.display()
        );
        self.progress.on_batch_start(documents.len());

        let stems = unique_stems(&documents);
        let mut result = BatchResult::default();
        for (i, (source, stem)) in documents.iter().zip(stems).enumerate() {
            if stem != document_stem(source) {
                warn!("{}: name already used in this batch, writing as {}", source.display(), stem);
            }
            let doc = Document::with_stem(source.clone(), stem);
            let report = self.process_one(doc, &work_root, output_dir, i + 1).await;
            self.progress.on_document_complete(&report);
            result.record(report);
        }

        result.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Batch complete: {}/{} succeeded, {} failed in {}ms",
            result.succeeded, result.attempted, result.failed, result.duration_ms
        );
        self.progress.on_batch_complete(&result);

        Ok(BatchOutcome::Completed(result))
    }

    /// Run one document, converting errors and panics into a failed report.
    async fn process_one(&self, doc: Document, work_root: &Path, output_dir: &Path, doc_num: usize) -> DocumentReport {
        let started = Instant::now();
        let source = doc.source.clone();
        info!("[{}] {}", doc_num, source.display());

        let outcome = AssertUnwindSafe(self.pipeline.process(doc, work_root, output_dir, doc_num))
            .catch_unwind()
            .await;
        let elapsed = || started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                error!("{}: {}", source.display(), e);
                DocumentReport::failed(source.clone(), e, elapsed())
            }
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                error!("{}: pipeline panicked: {}", source.display(), msg);
                DocumentReport::failed(source.clone(), format!("Internal error: {msg}"), elapsed())
            }
        }
    }
}
