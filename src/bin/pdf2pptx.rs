//! CLI binary for edgequake-pdf2pptx.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2pptx::pipeline::input::resolve_inputs;
use edgequake_pdf2pptx::{
    BatchConfig, BatchCoordinator, BatchOutcome, BatchProgressCallback, BatchResult, DocumentReport,
    DocumentStatus, ExportFormat, ProgressCallback, DEFAULT_MODEL,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar per document, counting pages back from the vision model.
///
/// Page events arrive out of order from the worker pool, so the bar only
/// counts; per-page lines are printed above it as they come in.
struct CliProgressCallback {
    bar: ProgressBar,
    total_documents: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Rasterising…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            total_documents: AtomicUsize::new(0),
        })
    }

    fn tick(&self) {
        if self.bar.position() < self.bar.length().unwrap_or(0) {
            self.bar.inc(1);
        }
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.total_documents.store(total_documents, Ordering::SeqCst);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, doc: &str, doc_num: usize, total_pages: usize) {
        let total_docs = self.total_documents.load(Ordering::SeqCst);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_pages as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(format!("[{doc_num}/{total_docs}] {doc}"));
        self.bar.reset_elapsed();
    }

    fn on_page_vectorized(&self, _doc: &str, page_num: usize, total_pages: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim("vectorized")
        ));
        self.tick();
    }

    fn on_page_failed(&self, _doc: &str, page_num: usize, total_pages: usize, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg)
        ));
        self.tick();
    }

    fn on_document_complete(&self, report: &DocumentReport) {
        let name = report.source.display().to_string();
        let line = match (report.status, &report.output) {
            (DocumentStatus::Failed, _) | (_, None) => format!(
                "{} {}  {}",
                red("✘"),
                bold(&name),
                red(report.error.as_deref().unwrap_or("failed"))
            ),
            (status, Some(out)) => format!(
                "{} {}  {}/{} pages  {}  →  {}",
                if status == DocumentStatus::Success {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                bold(&name),
                report.assembled_pages,
                report.total_pages,
                dim(&format!("{:.1}s", report.duration_ms as f64 / 1000.0)),
                out.display()
            ),
        };
        self.bar.println(line);
    }

    fn on_batch_complete(&self, _result: &BatchResult) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in ./input into ./output
  pdf2pptx

  # Explicit files and output directory
  pdf2pptx report.pdf slides.pdf -o decks/

  # PNG artifacts instead of EMF, five pages in flight
  pdf2pptx --format png --concurrency 5 input/

  # Keep intermediate PNG/SVG/EMF files for inspection
  pdf2pptx --work-dir temp/

  # JSON summary for scripting
  pdf2pptx --json > result.json

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY      OpenRouter API key (default route for the default model)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  PDF2PPTX_MODEL          Override model ID
  PDF2PPTX_PROVIDER       Override provider (openrouter, openai, anthropic, gemini, ollama)
  PDF2PPTX_CONCURRENCY    Pages vectorized at once
  PDF2PPTX_INKSCAPE       Path to the inkscape binary
  RUST_LOG                Log filter (overrides --verbose/--quiet)

REQUIREMENTS:
  • pdfium next to the executable or installed system-wide
  • Inkscape 1.x (brew install --cask inkscape / apt install inkscape)
"#;

/// Convert PDF pages into editable PowerPoint slides using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2pptx",
    version,
    about = "Convert PDF pages into editable PowerPoint slides using Vision LLMs",
    long_about = "Render each PDF page, ask a vision model to redraw it as SVG, convert the SVG \
to EMF with Inkscape and place one page per slide. Charts and diagrams arrive in PowerPoint as \
editable vector shapes.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input directory or PDF files.
    #[arg(default_value = "input")]
    inputs: Vec<PathBuf>,

    /// Directory the decks are written to.
    #[arg(short, long, env = "PDF2PPTX_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Keep intermediate files here instead of a temporary directory.
    #[arg(long, env = "PDF2PPTX_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Vision model ID.
    #[arg(long, env = "PDF2PPTX_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// LLM provider: openrouter, openai, anthropic, gemini, ollama.
    #[arg(
        long,
        env = "PDF2PPTX_PROVIDER",
        long_help = "LLM provider. Defaults to openrouter when OPENROUTER_API_KEY is set,\n\
          otherwise auto-detected from API key env vars."
    )]
    provider: Option<String>,

    /// Pages vectorized at the same time.
    #[arg(short, long, env = "PDF2PPTX_CONCURRENCY", default_value_t = 3)]
    concurrency: usize,

    /// Attempts per page against the vision model.
    #[arg(long, env = "PDF2PPTX_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Base retry backoff in milliseconds (doubles each attempt).
    #[arg(long, env = "PDF2PPTX_RETRY_BACKOFF_MS", default_value_t = 2000)]
    retry_backoff_ms: u64,

    /// Per-attempt timeout in seconds for the vision call.
    #[arg(long, env = "PDF2PPTX_PAGE_TIMEOUT")]
    page_timeout: Option<u64>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PDF2PPTX_DPI", default_value_t = 144,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2PPTX_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom vectorization prompt.
    #[arg(long, env = "PDF2PPTX_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "PDF2PPTX_MAX_TOKENS", default_value_t = 16384)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2PPTX_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Path to the inkscape binary.
    #[arg(long, env = "PDF2PPTX_INKSCAPE")]
    inkscape: Option<PathBuf>,

    /// Slide artifact format.
    #[arg(long, env = "PDF2PPTX_FORMAT", value_enum, default_value = "emf")]
    format: FormatArg,

    /// Print the batch result as JSON on stdout.
    #[arg(long, env = "PDF2PPTX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2PPTX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PPTX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PPTX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Emf,
    Png,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Emf => ExportFormat::Emf,
            FormatArg::Png => ExportFormat::Png,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // With the progress bar active, INFO lines would tear through it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Nothing to do? ───────────────────────────────────────────────────
    // Checked before building the coordinator so an empty folder does not
    // need an API key or Inkscape.
    let documents = resolve_inputs(&cli.inputs).context("Failed to read input")?;
    if documents.is_empty() {
        let searched = cli.inputs.first().cloned().unwrap_or_default();
        if cli.json {
            let outcome = BatchOutcome::NoInput { searched };
            println!("{}", serde_json::to_string_pretty(&outcome).context("Failed to serialise result")?);
        } else if !cli.quiet {
            eprintln!("{} No input found in {}", cyan("⚠"), searched.display());
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run batch ────────────────────────────────────────────────────────
    let coordinator = BatchCoordinator::new(config).context("Failed to initialise pipeline")?;
    let outcome = coordinator
        .run(&cli.inputs, &cli.output_dir)
        .await
        .context("Batch failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome).context("Failed to serialise result")?);
    }

    let result = match outcome {
        BatchOutcome::NoInput { searched } => {
            if !cli.quiet && !cli.json {
                eprintln!("{} No input found in {}", cyan("⚠"), searched.display());
            }
            return Ok(());
        }
        BatchOutcome::Completed(result) => result,
    };

    if !cli.quiet && !cli.json {
        if !show_progress {
            for doc in &result.documents {
                match &doc.output {
                    Some(out) => eprintln!(
                        "{}: {}/{} pages → {}",
                        doc.source.display(),
                        doc.assembled_pages,
                        doc.total_pages,
                        out.display()
                    ),
                    None => eprintln!(
                        "{}: failed: {}",
                        doc.source.display(),
                        doc.error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
        }
        eprintln!(
            "{}  {}/{} documents converted  {}",
            if result.failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&result.succeeded.to_string()),
            result.attempted,
            dim(&format!("{:.1}s", result.duration_ms as f64 / 1000.0)),
        );
    }

    if result.succeeded == 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `BatchConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .concurrency(cli.concurrency)
        .max_attempts(cli.max_attempts)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .dpi(cli.dpi)
        .model(cli.model.clone())
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .export_format(cli.format.into());

    if let Some(secs) = cli.page_timeout {
        builder = builder.page_timeout_secs(secs);
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref path) = cli.inkscape {
        builder = builder.inkscape_path(path.clone());
    }
    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
