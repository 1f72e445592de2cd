//! Per-document pipeline: rasterize → vectorize/sanitize → convert → assemble.
//!
//! Only the vectorize/sanitize stage runs concurrently (bounded by
//! [`BatchConfig::concurrency`]); rasterization, conversion and assembly run
//! one page at a time in index order. Page failures are recorded on the page
//! and never stop the document; only rasterization failures surface as
//! `Err(DocumentError)`.

use crate::config::BatchConfig;
use crate::document::{Document, Page, PageStatus};
use crate::error::{DocumentError, PageError};
use crate::output::DocumentReport;
use crate::pipeline::assemble::{PptxAssembler, SlideImage};
use crate::pipeline::export::FormatConverter;
use crate::pipeline::llm::{BoxedBackoff, VectorizationClient, VectorizationService};
use crate::pipeline::pool::run_indexed;
use crate::pipeline::render::Rasterizer;
use crate::pipeline::sanitize::sanitize_svg;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs one document through every stage.
///
/// Built once per batch from the config and the three collaborator seams;
/// holds no per-document state, so the same pipeline processes every
/// document in turn.
pub struct DocumentPipeline {
    rasterizer: Arc<dyn Rasterizer>,
    vectorizer: VectorizationClient<BoxedBackoff>,
    converter: Arc<dyn FormatConverter>,
    assembler: PptxAssembler,
    concurrency: usize,
    progress: ProgressCallback,
}

impl DocumentPipeline {
    pub fn new(
        config: &BatchConfig,
        rasterizer: Arc<dyn Rasterizer>,
        service: Arc<dyn VectorizationService>,
        converter: Arc<dyn FormatConverter>,
    ) -> Self {
        let backoff: BoxedBackoff = Box::new(config.backoff());
        let vectorizer = VectorizationClient::new(service, config.max_attempts, backoff)
            .with_attempt_timeout(config.page_timeout_secs.map(Duration::from_secs));
        Self {
            rasterizer,
            vectorizer,
            converter,
            assembler: PptxAssembler::new(config.canvas),
            concurrency: config.concurrency.max(1),
            progress: config
                .progress_callback
                .clone()
                .unwrap_or_else(|| Arc::new(NoopProgressCallback) as ProgressCallback),
        }
    }

    /// The converter seam, for the batch preflight.
    pub fn converter(&self) -> &dyn FormatConverter {
        self.converter.as_ref()
    }

    /// Process one document.
    ///
    /// Intermediate files go under `work_root/<stem>/`; the deck is written
    /// to `output_dir/<stem>_Editable.pptx` when at least one page survives.
    /// Callers running several documents into one directory must give each
    /// a distinct stem (see [`unique_stems`](crate::document::unique_stems)).
    /// A document whose pages all fail still returns `Ok` with a failed report.
    pub async fn process(
        &self,
        mut doc: Document,
        work_root: &Path,
        output_dir: &Path,
        doc_num: usize,
    ) -> Result<DocumentReport, DocumentError> {
        let started = Instant::now();
        let work = work_root.join(&doc.stem);
        let name = doc.stem.clone();

        // ── Step 1: Rasterize ────────────────────────────────────────────────
        let rasters = self.rasterizer.rasterize(&doc.source, &work.join("images")).await?;
        doc.pages = rasters
            .into_iter()
            .enumerate()
            .map(|(index, raster)| {
                let mut page = Page::new(index);
                page.raster = Some(raster);
                page.status = PageStatus::Rasterized;
                page
            })
            .collect();
        let total = doc.pages.len();
        info!("{}: {} pages rasterized", name, total);
        self.progress.on_document_start(&name, doc_num, total);

        // ── Step 2: Vectorize + sanitize (concurrent) ────────────────────────
        let svg_dir = work.join("svgs");
        tokio::fs::create_dir_all(&svg_dir)
            .await
            .map_err(|e| DocumentError::Io {
                path: svg_dir.clone(),
                source: e,
            })?;

        let rasters: Vec<Option<PathBuf>> = doc.pages.iter().map(|p| p.raster.clone()).collect();
        let pages = std::mem::take(&mut doc.pages);
        doc.pages = run_indexed(
            pages,
            self.concurrency,
            |_, page| self.vectorize_page(&name, total, &svg_dir, page),
            |idx, msg| {
                let mut page = Page::new(idx);
                page.raster = rasters[idx].clone();
                let err = PageError::WorkerAborted {
                    page: idx + 1,
                    detail: msg,
                };
                self.progress.on_page_failed(&name, idx + 1, total, &err.to_string());
                page.fail(PageStatus::VectorizeFailed, err);
                page
            },
        )
        .await;

        // ── Step 3: Convert (sequential) ─────────────────────────────────────
        let artifact_dir = work.join(self.converter.output_extension());
        for page in doc.pages.iter_mut() {
            if page.status != PageStatus::Vectorized {
                continue;
            }
            self.convert_page(&name, total, &artifact_dir, page).await;
        }

        // ── Step 4: Assemble ─────────────────────────────────────────────────
        let output = self.assemble(&mut doc, output_dir).await?;

        let mut report = DocumentReport::from_document(&doc, output, started.elapsed().as_millis() as u64);
        if report.output.is_none() {
            report.error = Some(DocumentError::NoPagesAssembled { total }.to_string());
        }
        info!(
            "{}: {}/{} pages assembled in {}ms",
            name, report.assembled_pages, total, report.duration_ms
        );
        Ok(report)
    }

    async fn vectorize_page(&self, doc: &str, total: usize, svg_dir: &Path, mut page: Page) -> Page {
        let page_num = page.number();
        let Some(raster) = page.raster.clone() else {
            let err = PageError::VectorizeFailed {
                page: page_num,
                attempts: 0,
                detail: "page was never rasterized".into(),
            };
            self.progress.on_page_failed(doc, page_num, total, &err.to_string());
            page.fail(PageStatus::VectorizeFailed, err);
            return page;
        };

        let outcome = self.vectorizer.vectorize_page(doc, page_num, &raster).await;
        page.retry = outcome.retry;

        let raw = match outcome.result {
            Ok(raw) => raw,
            Err(err) => {
                warn!("{} page {}: {}", doc, page_num, err);
                self.progress.on_page_failed(doc, page_num, total, &err.to_string());
                page.fail(PageStatus::VectorizeFailed, err);
                return page;
            }
        };
        page.status = PageStatus::Vectorized;

        let result = match sanitize_svg(&raw) {
            Ok(svg) => {
                let path = svg_dir.join(format!("page_{page_num}.svg"));
                tokio::fs::write(&path, &svg)
                    .await
                    .map(|_| (svg, path))
                    .map_err(|e| format!("writing markup: {e}"))
            }
            Err(e) => Err(e.to_string()),
        };
        page.raw_markup = Some(raw);

        match result {
            Ok((svg, path)) => {
                debug!("{} page {}: {} bytes of SVG", doc, page_num, svg.len());
                page.markup = Some(svg);
                page.markup_path = Some(path);
                self.progress.on_page_vectorized(doc, page_num, total);
            }
            Err(detail) => {
                let err = PageError::SanitizeFailed { page: page_num, detail };
                warn!("{} page {}: {}", doc, page_num, err);
                self.progress.on_page_failed(doc, page_num, total, &err.to_string());
                page.fail(PageStatus::VectorizeFailed, err);
            }
        }
        page
    }

    async fn convert_page(&self, doc: &str, total: usize, artifact_dir: &Path, page: &mut Page) {
        let page_num = page.number();
        let Some(markup) = page.markup_path.clone() else {
            return;
        };
        let out = artifact_dir.join(format!("page_{}.{}", page_num, self.converter.output_extension()));

        match self.converter.convert(&markup, &out).await {
            Ok(()) => {
                page.artifact = Some(out);
                page.status = PageStatus::Converted;
            }
            Err(e) => {
                warn!("{} page {}: conversion failed: {}", doc, page_num, e);
                let err = PageError::ConvertFailed {
                    page: page_num,
                    detail: e.to_string(),
                };
                self.progress.on_page_failed(doc, page_num, total, &err.to_string());
                page.fail(PageStatus::ConvertFailed, err);
            }
        }
    }

    /// Place every converted page on a slide; returns the written path, if any.
    async fn assemble(&self, doc: &mut Document, output_dir: &Path) -> Result<Option<PathBuf>, DocumentError> {
        let slides: Vec<SlideImage> = doc
            .pages
            .iter()
            .filter(|p| p.status == PageStatus::Converted)
            .filter_map(|p| {
                p.artifact.clone().map(|path| SlideImage {
                    page_num: p.number(),
                    path,
                    page_raster: p.raster.clone(),
                })
            })
            .collect();

        if slides.is_empty() {
            warn!("{}: no page survived, nothing to assemble", doc.stem);
            return Ok(None);
        }

        let output = output_dir.join(doc.output_file_name());
        let assembler = self.assembler.clone();
        let title = doc.stem.clone();
        let target = output.clone();
        let included = tokio::task::spawn_blocking(move || assembler.assemble(&slides, &title, &target))
            .await
            .map_err(|e| DocumentError::Internal(format!("Assembly task panicked: {}", e)))??;

        for page in doc.pages.iter_mut().filter(|p| p.status == PageStatus::Converted) {
            if included.contains(&page.number()) {
                page.status = PageStatus::Assembled;
            } else {
                let page_num = page.number();
                page.fail(
                    PageStatus::ConvertFailed,
                    PageError::ConvertFailed {
                        page: page_num,
                        detail: "artifact could not be read at assembly".into(),
                    },
                );
            }
        }

        Ok((!included.is_empty()).then_some(output))
    }
}
