use std::ffi::OsString;
use std::path::Path;

use crate::error::TabellError;
use crate::layout::PageContent;
use crate::pdf::{run_tool, PdfInspector};

/// Page inspection through poppler-utils (`pdfinfo` and `pdftotext`).
pub struct PopplerInspector;

impl PopplerInspector {
    pub fn new() -> Self {
        PopplerInspector
    }
}

impl Default for PopplerInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfInspector for PopplerInspector {
    fn page_count(&self, pdf_path: &Path) -> Result<usize, TabellError> {
        let output = run_tool("pdfinfo", [pdf_path.as_os_str()])?;
        let info = String::from_utf8_lossy(&output.stdout);
        parse_page_count(&info).ok_or_else(|| {
            TabellError::Extraction(format!("pdfinfo reported no page count for {}", pdf_path.display()))
        })
    }

    fn page_texts(
        &self,
        pdf_path: &Path,
        first: usize,
        last: usize,
    ) -> Result<Vec<String>, TabellError> {
        let text = layout_text(pdf_path, Some((first, last)))?;
        Ok(split_pages(&text).map(str::to_string).collect())
    }

    fn backend_name(&self) -> &str {
        "poppler"
    }
}

/// Every page of the document as `pdftotext -layout` renders it.
pub fn layout_pages(pdf_path: &Path) -> Result<Vec<PageContent>, TabellError> {
    let text = layout_text(pdf_path, None)?;
    Ok(split_pages(&text)
        .enumerate()
        .map(|(i, page)| PageContent {
            page_number: i + 1,
            lines: page.lines().map(|l| l.to_string()).collect(),
        })
        .collect())
}

fn layout_text(pdf_path: &Path, range: Option<(usize, usize)>) -> Result<String, TabellError> {
    let mut args: Vec<OsString> = vec!["-layout".into()];
    if let Some((first, last)) = range {
        args.push("-f".into());
        args.push(first.max(1).to_string().into());
        args.push("-l".into());
        args.push(last.max(first).to_string().into());
    }
    args.push(pdf_path.as_os_str().to_owned());
    args.push("-".into());

    let output = run_tool("pdftotext", args)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// pdftotext ends every page with a form feed, so the last piece is dropped.
fn split_pages(text: &str) -> impl Iterator<Item = &str> {
    let trimmed = text.strip_suffix('\x0c').unwrap_or(text);
    trimmed.split('\x0c')
}

fn parse_page_count(info: &str) -> Option<usize> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|v| v.trim().parse().ok())
}
