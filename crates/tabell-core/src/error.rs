use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TabellError {
    #[error("no tables found in PDF after OCR/fallback ({attempts} strategies tried)")]
    NoTablesFound { attempts: usize },

    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("{tool} not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PopplerNotFound { tool: String },

    #[error("{tool} failed with exit code {code}: {stderr}")]
    PopplerFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read PDF structure: {0}")]
    Pdf(String),

    #[error("ocrmypdf not found. Install it with: brew install ocrmypdf (macOS) or apt install ocrmypdf (Linux)")]
    OcrNotFound,

    #[error("OCR failed with exit code {code}: {stderr}")]
    OcrFailed { code: i32, stderr: String },

    #[error("OCR timed out after {seconds} seconds")]
    OcrTimeout { seconds: u64 },

    #[error("failed to write spreadsheet: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to load config from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TabellError {
    /// True for the expected "nothing to extract" outcome, as opposed to a fault.
    pub fn is_no_tables(&self) -> bool {
        matches!(self, TabellError::NoTablesFound { .. })
    }

    /// True for failures raised by the OCR normalizer.
    pub fn is_ocr(&self) -> bool {
        matches!(
            self,
            TabellError::OcrNotFound | TabellError::OcrFailed { .. } | TabellError::OcrTimeout { .. }
        )
    }
}

impl From<lopdf::Error> for TabellError {
    fn from(e: lopdf::Error) -> Self {
        TabellError::Pdf(e.to_string())
    }
}
