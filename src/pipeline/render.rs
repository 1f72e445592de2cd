//! PDF rasterisation: render every page of a document to a PNG file.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-aware. Rendering happens on the blocking thread pool so Tokio worker
//! threads stay free for timers and I/O.
//!
//! Pages are rendered strictly in document order, one at a time; each
//! bitmap is written to disk and dropped before the next one is rendered,
//! which keeps peak memory at a single page.

use crate::config::BatchConfig;
use crate::error::{BatchError, DocumentError};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Renders a source document into ordered page images.
///
/// Implementations must return pages in document order; the returned
/// position of each path becomes the page's permanent index.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, source: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, DocumentError>;
}

/// Rasterizer backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
}

impl PdfiumRasterizer {
    /// Create the rasterizer, checking once that a pdfium library can be bound.
    pub fn new(config: &BatchConfig) -> Result<Self, BatchError> {
        bind_pdfium().map_err(BatchError::PdfiumBindingFailed)?;
        Ok(Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn rasterize(&self, source: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
        let path = source.to_path_buf();
        let out = out_dir.to_path_buf();
        let this = self.clone();

        tokio::task::spawn_blocking(move || this.rasterize_blocking(&path, &out))
            .await
            .map_err(|e| DocumentError::Internal(format!("Render task panicked: {}", e)))?
    }
}

impl PdfiumRasterizer {
    fn rasterize_blocking(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
        let pdfium = bind_pdfium().map_err(DocumentError::Internal)?;
        let password = self.password.as_deref();

        let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    DocumentError::WrongPassword {
                        path: pdf_path.to_path_buf(),
                    }
                } else {
                    DocumentError::PasswordRequired {
                        path: pdf_path.to_path_buf(),
                    }
                }
            } else {
                DocumentError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!(
            "Rasterising {} ({} pages)",
            pdf_path.display(),
            total_pages
        );
        if total_pages == 0 {
            return Err(DocumentError::EmptyDocument {
                path: pdf_path.to_path_buf(),
            });
        }

        std::fs::create_dir_all(out_dir).map_err(|e| DocumentError::Io {
            path: out_dir.to_path_buf(),
            source: e,
        })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut results = Vec::with_capacity(total_pages);

        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                DocumentError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            let file = out_dir.join(format!("page_{page_num}.png"));
            image
                .save_with_format(&file, image::ImageFormat::Png)
                .map_err(|e| DocumentError::RasterisationFailed {
                    page: page_num,
                    detail: format!("PNG encoding failed: {}", e),
                })?;

            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );
            results.push(file);
        }

        Ok(results)
    }
}

/// Bind to a pdfium library next to the executable, falling back to the system one.
fn bind_pdfium() -> Result<Pdfium, String> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| format!("{:?}", e))?;
    Ok(Pdfium::new(bindings))
}
