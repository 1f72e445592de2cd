//! Format conversion: SVG → EMF/PNG through the Inkscape command line.
//!
//! Inkscape is not safe to run concurrently against the same profile
//! directory, so the document pipeline calls [`FormatConverter::convert`]
//! one page at a time. A failure only affects the page being converted.
//!
//! ## Locating the binary
//!
//! 1. An explicitly configured path (`--inkscape`)
//! 2. Well-known install locations (the macOS app bundle does not put
//!    `inkscape` on PATH)
//! 3. A PATH lookup via the `which` crate

use crate::config::{BatchConfig, ExportFormat};
use crate::error::{BatchError, ConvertError, INKSCAPE_INSTALL_HINT};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Converts one sanitized markup file into an embeddable artifact.
#[async_trait]
pub trait FormatConverter: Send + Sync {
    /// Environment check run once before the batch starts.
    fn probe(&self) -> Result<(), BatchError>;

    /// Extension of the produced artifacts, without the dot.
    fn output_extension(&self) -> &'static str;

    /// Convert `markup` into `output`. Must leave a non-empty file at `output` on success.
    async fn convert(&self, markup: &Path, output: &Path) -> Result<(), ConvertError>;
}

const TOOL_NAME: &str = "inkscape";

/// Install locations probed before falling back to PATH.
const WELL_KNOWN_PATHS: &[&str] = &[
    "/Applications/Inkscape.app/Contents/MacOS/inkscape",
    "C:\\Program Files\\Inkscape\\bin\\inkscape.exe",
];

/// Inkscape-backed converter.
#[derive(Debug, Clone)]
pub struct InkscapeConverter {
    tool: Option<PathBuf>,
    format: ExportFormat,
}

impl InkscapeConverter {
    /// Locate Inkscape using the configured path, well-known locations and PATH.
    ///
    /// Never fails; a missing tool is reported by [`FormatConverter::probe`].
    pub fn new(config: &BatchConfig) -> Self {
        let tool = locate_tool(config.inkscape_path.as_deref(), WELL_KNOWN_PATHS);
        match &tool {
            Some(p) => info!("Using {} at {}", TOOL_NAME, p.display()),
            None => debug!("{} not found", TOOL_NAME),
        }
        Self {
            tool,
            format: config.export_format,
        }
    }

    pub fn tool_path(&self) -> Option<&Path> {
        self.tool.as_deref()
    }
}

/// Fixed-path probe followed by a PATH lookup.
fn locate_tool(explicit: Option<&Path>, well_known: &[&str]) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(well_known.iter().map(PathBuf::from))
        .find(|p| p.is_file())
        .or_else(|| which::which(TOOL_NAME).ok())
}

#[async_trait]
impl FormatConverter for InkscapeConverter {
    fn probe(&self) -> Result<(), BatchError> {
        match self.tool {
            Some(_) => Ok(()),
            None => Err(BatchError::ToolNotFound {
                tool: TOOL_NAME.to_string(),
                hint: INKSCAPE_INSTALL_HINT.to_string(),
            }),
        }
    }

    fn output_extension(&self) -> &'static str {
        self.format.extension()
    }

    async fn convert(&self, markup: &Path, output: &Path) -> Result<(), ConvertError> {
        let tool = self.tool.as_ref().ok_or_else(|| ConvertError::ToolMissing {
            tool: TOOL_NAME.to_string(),
        })?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConvertError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        // Stale output from an earlier run must not be mistaken for success.
        let _ = tokio::fs::remove_file(output).await;

        let result = Command::new(tool)
            .arg(markup)
            .arg(format!("--export-type={}", self.format.extension()))
            .arg(format!("--export-filename={}", output.display()))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ConvertError::Spawn {
                tool: tool.display().to_string(),
                source: e,
            })?;

        if !result.status.success() {
            return Err(ConvertError::NonZeroExit {
                tool: TOOL_NAME.to_string(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => {
                debug!("{} → {} ({} bytes)", markup.display(), output.display(), meta.len());
                Ok(())
            }
            _ => Err(ConvertError::MissingOutput {
                path: output.to_path_buf(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_is_probed_first() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("my-inkscape");
        std::fs::write(&fake, b"#!/bin/sh\n").unwrap();
        let found = locate_tool(Some(&fake), &[]).unwrap();
        assert_eq!(found, fake);
    }

    #[test]
    fn well_known_path_used_when_no_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("inkscape");
        std::fs::write(&fake, b"").unwrap();
        let well_known = [fake.to_str().unwrap()];
        assert_eq!(locate_tool(None, &well_known), Some(fake));
    }

    #[test]
    fn missing_explicit_path_falls_through() {
        let bogus = Path::new("/no/such/inkscape");
        // Falls through to PATH; result depends on the host, but never the bogus path.
        assert_ne!(locate_tool(Some(bogus), &[]).as_deref(), Some(bogus));
    }

    #[test]
    fn probe_reports_missing_tool_with_hint() {
        let converter = InkscapeConverter {
            tool: None,
            format: ExportFormat::Emf,
        };
        match converter.probe() {
            Err(BatchError::ToolNotFound { tool, hint }) => {
                assert_eq!(tool, "inkscape");
                assert!(hint.contains("brew install"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn convert_without_tool_is_page_level_error() {
        let converter = InkscapeConverter {
            tool: None,
            format: ExportFormat::Png,
        };
        let err = converter
            .convert(Path::new("a.svg"), Path::new("a.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::ToolMissing { .. }));
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("inkscape");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_captures_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "echo 'bad svg' >&2\nexit 3");
        let converter = InkscapeConverter {
            tool: Some(tool),
            format: ExportFormat::Emf,
        };
        let err = converter
            .convert(&dir.path().join("p.svg"), &dir.path().join("out/p.emf"))
            .await
            .unwrap_err();
        match err {
            ConvertError::NonZeroExit { stderr, .. } => assert_eq!(stderr, "bad svg"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_requires_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let silent = script(dir.path(), "exit 0");
        let converter = InkscapeConverter {
            tool: Some(silent),
            format: ExportFormat::Emf,
        };
        let err = converter
            .convert(&dir.path().join("p.svg"), &dir.path().join("p.emf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::MissingOutput { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn writes_to_export_filename() {
        let dir = tempfile::tempdir().unwrap();
        // $3 is --export-filename=<path>
        let tool = script(dir.path(), "out=\"${3#--export-filename=}\"\nprintf 'EMF' > \"$out\"");
        let converter = InkscapeConverter {
            tool: Some(tool),
            format: ExportFormat::Emf,
        };
        let out = dir.path().join("emf/page_1.emf");
        converter
            .convert(&dir.path().join("page_1.svg"), &out)
            .await
            .expect("conversion succeeds");
        assert_eq!(std::fs::read(&out).unwrap(), b"EMF");
    }
}
