pub mod poppler;

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Output};

use tracing::{debug, warn};

use crate::error::TabellError;

/// Page-level text access to a PDF on disk.
pub trait PdfInspector: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf_path: &Path) -> Result<usize, TabellError>;

    /// Extracted text of pages `first..=last` (1-based), one entry per page.
    /// `last` past the end of the document is clamped.
    fn page_texts(&self, pdf_path: &Path, first: usize, last: usize)
        -> Result<Vec<String>, TabellError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Whether any of the first `pages` pages carries non-blank embedded text.
///
/// Inspection errors count as "no text", which sends the document to OCR.
pub fn has_selectable_text(inspector: &dyn PdfInspector, pdf_path: &Path, pages: usize) -> bool {
    match inspector.page_texts(pdf_path, 1, pages.max(1)) {
        Ok(texts) => {
            let found = texts.iter().any(|t| !t.trim().is_empty());
            debug!(
                backend = inspector.backend_name(),
                pages_checked = texts.len(),
                found,
                "text presence check"
            );
            found
        }
        Err(e) => {
            warn!(
                backend = inspector.backend_name(),
                error = %e,
                "text presence check failed, assuming no usable text"
            );
            false
        }
    }
}

/// Reject input that is obviously not a PDF before any tool sees it.
///
/// `name` is checked for a `.pdf` extension when given; the content must start
/// with `%PDF` and be at most `max_bytes` long.
pub fn check_pdf_input(name: Option<&Path>, bytes: &[u8], max_bytes: u64) -> Result<(), TabellError> {
    if let Some(name) = name {
        let is_pdf = name
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(TabellError::InvalidInput(format!(
                "{} is not a .pdf file",
                name.display()
            )));
        }
    }

    if bytes.len() as u64 > max_bytes {
        return Err(TabellError::InvalidInput(format!(
            "file too large (> {} MB)",
            max_bytes / (1024 * 1024)
        )));
    }

    if !bytes.starts_with(b"%PDF") {
        return Err(TabellError::InvalidInput(
            "file content is not a valid PDF".into(),
        ));
    }

    Ok(())
}

/// Run a poppler command-line tool and return its output on success.
pub(crate) fn run_tool<I, S>(tool: &str, args: I) -> Result<Output, TabellError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(tool).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TabellError::PopplerNotFound {
                tool: tool.to_string(),
            }
        } else {
            TabellError::Extraction(format!("{tool} failed: {e}"))
        }
    })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(TabellError::PopplerFailed {
            tool: tool.to_string(),
            code,
            stderr,
        });
    }

    Ok(output)
}

/// Check if a command-line tool can be started at all.
pub(crate) fn tool_available(tool: &str) -> bool {
    Command::new(tool)
        .arg("-v")
        .output()
        .map(|o| o.status.success() || !o.stderr.is_empty())
        .unwrap_or(false)
}
