//! Input discovery: turn a directory or an explicit file list into the
//! ordered set of PDFs the batch will process.
//!
//! A missing location is an environment error. An existing location with no
//! PDFs is not an error; the coordinator reports it as "no input found".

use crate::error::BatchError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// True when the file extension is `.pdf`, in any case.
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// List the PDFs directly inside `dir`, sorted by file name.
///
/// Subdirectories are not searched.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.exists() {
        return Err(BatchError::InputNotFound {
            path: dir.to_path_buf(),
        });
    }
    if dir.is_file() {
        return Ok(if is_pdf_path(dir) {
            vec![dir.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| BatchError::InputUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(e) => Some(e.path()),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|p| p.is_file() && is_pdf_path(p))
        .collect();

    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Discovered {} PDF(s) in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// Validate an explicit list of inputs, keeping the caller's order.
///
/// Directories in the list are expanded in place; non-PDF files are skipped
/// with a warning.
pub fn resolve_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    let mut out = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !input.exists() {
            return Err(BatchError::InputNotFound {
                path: input.clone(),
            });
        }
        if input.is_dir() {
            out.extend(discover_pdfs(input)?);
        } else if is_pdf_path(input) {
            out.push(input.clone());
        } else {
            warn!("Skipping non-PDF input: {}", input.display());
        }
    }
    Ok(out)
}
