//! Configuration types for batch PDF-to-PPTX conversion.
//!
//! Every knob lives in one immutable [`BatchConfig`], built once at startup
//! via [`BatchConfigBuilder`] and handed to each component constructor. No
//! component reads the process environment on its own; the CLI maps flags
//! and env vars onto the builder and that is the only place they are read.

use crate::error::BatchError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::progress::ProgressCallback;

/// Configuration for a batch conversion.
///
/// # Example
/// ```rust
/// use edgequake_pdf2pptx::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .concurrency(3)
///     .max_attempts(3)
///     .model("google/gemini-3-pro-preview")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 3);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Number of pages vectorized at the same time within one document. Default: 3.
    ///
    /// Sized for the vectorization service's rate limits, not for local CPUs.
    pub concurrency: usize,

    /// Maximum attempts per page against the vectorization service. Default: 3.
    pub max_attempts: u32,

    /// Base backoff in milliseconds. Default: 2000.
    ///
    /// The delay before attempt `n + 1` is `retry_backoff_ms * 2^(n - 1)`:
    /// 2 s, then 4 s.
    pub retry_backoff_ms: u64,

    /// Optional wall-clock limit for a single vectorization attempt. Default: none.
    pub page_timeout_secs: Option<u64>,

    /// Rendering DPI used when rasterising each page. Range: 72–400. Default: 144.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Vision model identifier. Default: `google/gemini-3-pro-preview`.
    pub model: String,

    /// LLM provider name (e.g. "openrouter", "openai"). If None, auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens generated per page. Default: 16384.
    ///
    /// SVG is verbose; a dense chart easily needs several thousand tokens.
    pub max_tokens: usize,

    /// Custom vectorization prompt. If None, uses [`crate::prompts::VECTORIZE_PROMPT`].
    pub system_prompt: Option<String>,

    /// Explicit path to the Inkscape binary, probed before the defaults.
    pub inkscape_path: Option<PathBuf>,

    /// Format Inkscape exports each page to. Default: [`ExportFormat::Emf`].
    pub export_format: ExportFormat,

    /// Slide canvas used by the assembler.
    pub canvas: Canvas,

    /// Where intermediate files go. If None, a temp directory is used and removed afterwards.
    pub work_dir: Option<PathBuf>,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            max_attempts: 3,
            retry_backoff_ms: 2000,
            page_timeout_secs: None,
            dpi: 144,
            max_rendered_pixels: 4000,
            password: None,
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 16384,
            system_prompt: None,
            inkscape_path: None,
            export_format: ExportFormat::default(),
            canvas: Canvas::default(),
            work_dir: None,
            progress_callback: None,
        }
    }
}

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "google/gemini-3-pro-preview";

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("concurrency", &self.concurrency)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("dpi", &self.dpi)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("export_format", &self.export_format)
            .field("canvas", &self.canvas)
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// Exponential backoff derived from `retry_backoff_ms`.
    pub fn backoff(&self) -> impl Fn(u32) -> Duration + Send + Sync + Clone + 'static {
        crate::retry::exponential_backoff(Duration::from_millis(self.retry_backoff_ms))
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = Some(secs);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn inkscape_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.inkscape_path = Some(path.into());
        self
    }

    pub fn export_format(mut self, format: ExportFormat) -> Self {
        self.config.export_format = format;
        self
    }

    pub fn canvas(mut self, canvas: Canvas) -> Self {
        self.config.canvas = canvas;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(BatchError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(BatchError::InvalidConfig("model must not be empty".into()));
        }
        if c.page_timeout_secs == Some(0) {
            return Err(BatchError::InvalidConfig(
                "page timeout must be ≥ 1 second".into(),
            ));
        }
        let cv = &c.canvas;
        if cv.margin_emu.saturating_mul(2) >= cv.width_emu
            || cv.margin_emu.saturating_mul(2) >= cv.height_emu
        {
            return Err(BatchError::InvalidConfig(format!(
                "canvas margins ({} EMU) leave no room on a {}x{} EMU slide",
                cv.margin_emu, cv.width_emu, cv.height_emu
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Artifact format Inkscape produces for each page.
///
/// EMF stays vector inside PowerPoint and can be ungrouped into editable
/// shapes; PNG is a raster fallback for viewers without EMF support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    Emf,
    Png,
}

impl ExportFormat {
    /// Value passed to `inkscape --export-type=`; doubles as the file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Emf => "emf",
            ExportFormat::Png => "png",
        }
    }

    /// MIME type declared in the PPTX content-types part.
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Emf => "image/x-emf",
            ExportFormat::Png => "image/png",
        }
    }
}

/// English Metric Units per inch, the unit of every OOXML coordinate.
pub const EMU_PER_INCH: u64 = 914_400;

/// Slide dimensions and margins, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width_emu: u64,
    pub height_emu: u64,
    pub margin_emu: u64,
}

impl Default for Canvas {
    /// 16:9 widescreen (13.33 in × 7.5 in) with half-inch margins.
    fn default() -> Self {
        Self {
            width_emu: 12_188_952,
            height_emu: 6_858_000,
            margin_emu: EMU_PER_INCH / 2,
        }
    }
}

impl Canvas {
    /// Width of the area inside the margins.
    pub fn content_width(&self) -> u64 {
        self.width_emu - 2 * self.margin_emu
    }

    /// Height of the area inside the margins.
    pub fn content_height(&self) -> u64 {
        self.height_emu - 2 * self.margin_emu
    }
}
