pub mod config;
pub mod error;
pub mod extraction;
pub mod layout;
pub mod model;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod workbook;

use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use config::{validate_config, ConversionConfig, OcrFailurePolicy};
use error::TabellError;
use extraction::{build_strategies, StrategyChain};
use model::{CleanedTable, Conversion, ConversionMetadata, Inspection};
use normalize::{clean_table, default_rules, CellRule, DEFAULT_HEADER_MAX_CHARS};
use ocr::{ocr_to_searchable_pdf, OcrEngine, OcrMyPdf, SearchablePdf};
use pdf::poppler::PopplerInspector;
use pdf::{has_selectable_text, PdfInspector};

/// Runs one PDF through text check, optional OCR, the extraction chain,
/// cell cleaning and the spreadsheet writer.
///
/// A converter holds no per-document state and can be reused.
pub struct Converter {
    inspector: Box<dyn PdfInspector>,
    ocr: Option<Box<dyn OcrEngine>>,
    on_ocr_failure: OcrFailurePolicy,
    chain: StrategyChain,
    cell_rules: Vec<CellRule>,
    header_max_chars: usize,
    text_check_pages: usize,
}

impl Converter {
    /// A converter without OCR and with the default cell rules.
    pub fn new(inspector: Box<dyn PdfInspector>, chain: StrategyChain) -> Self {
        if chain.is_empty() {
            warn!("extraction chain is empty, every conversion will find no tables");
        }
        Converter {
            inspector,
            ocr: None,
            on_ocr_failure: OcrFailurePolicy::Continue,
            chain,
            cell_rules: default_rules(),
            header_max_chars: DEFAULT_HEADER_MAX_CHARS,
            text_check_pages: 3,
        }
    }

    /// Poppler, ocrmypdf and the configured chain.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, TabellError> {
        validate_config(config)?;

        let chain = StrategyChain::new(build_strategies(&config.strategies));
        let mut converter = Converter::new(Box::new(PopplerInspector::new()), chain)
            .with_cell_rules(config.cell_rules.clone())
            .with_header_max_chars(config.header_max_chars)
            .with_text_check_pages(config.text_check_pages);
        if config.ocr.enabled {
            converter = converter.with_ocr(Box::new(OcrMyPdf::new(&config.ocr)), config.ocr.on_failure);
        }
        Ok(converter)
    }

    pub fn with_ocr(mut self, engine: Box<dyn OcrEngine>, on_failure: OcrFailurePolicy) -> Self {
        self.ocr = Some(engine);
        self.on_ocr_failure = on_failure;
        self
    }

    pub fn with_cell_rules(mut self, rules: Vec<CellRule>) -> Self {
        self.cell_rules = rules;
        self
    }

    pub fn with_header_max_chars(mut self, max: usize) -> Self {
        self.header_max_chars = max;
        self
    }

    pub fn with_text_check_pages(mut self, pages: usize) -> Self {
        self.text_check_pages = pages;
        self
    }

    /// Convert the PDF at `pdf_path`.
    ///
    /// Fails with [`TabellError::NoTablesFound`] when no strategy finds a
    /// table. OCR failures are absorbed or returned per the failure policy.
    pub fn convert(&self, pdf_path: &Path) -> Result<Conversion, TabellError> {
        info!(input = %pdf_path.display(), "conversion started");

        let (searchable, ocr_used) = self.ocr_if_needed(pdf_path)?;
        let source = searchable
            .as_ref()
            .map(SearchablePdf::path)
            .unwrap_or(pdf_path);

        let outcome = self.chain.run_filtered(source, |raw| {
            clean_table(raw, &self.cell_rules, self.header_max_chars).column_count() > 0
        });
        let attempts = outcome.attempts.len();

        let tables: Vec<CleanedTable> = outcome
            .tables
            .iter()
            .map(|raw| clean_table(raw, &self.cell_rules, self.header_max_chars))
            .collect();

        let extractor = match outcome.extractor {
            Some(label) if !tables.is_empty() => label,
            _ => {
                info!(attempts, "no tables found");
                return Err(TabellError::NoTablesFound { attempts });
            }
        };

        let pages = match self.inspector.page_count(source) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "could not read page count");
                None
            }
        };

        let workbook = workbook::write_workbook(&tables)?;
        let metadata = ConversionMetadata {
            extractor,
            pages,
            ocr_used,
            tables_found: tables.len(),
            attempts: outcome.attempts,
        };

        info!(
            extractor = %metadata.extractor,
            tables = metadata.tables_found,
            pages = ?metadata.pages,
            ocr_used,
            "conversion finished"
        );

        Ok(Conversion {
            workbook,
            metadata,
            tables,
        })
    }

    /// Convert an in-memory PDF through a temporary file.
    pub fn convert_bytes(&self, pdf_bytes: &[u8]) -> Result<Conversion, TabellError> {
        let mut tmp = tempfile::Builder::new()
            .prefix("tabell-")
            .suffix(".pdf")
            .tempfile()?;
        tmp.write_all(pdf_bytes)?;
        tmp.flush()?;
        self.convert(tmp.path())
    }

    /// Page count, text presence and the chain that would run.
    pub fn inspect(&self, pdf_path: &Path) -> Inspection {
        let has_text = has_selectable_text(self.inspector.as_ref(), pdf_path, self.text_check_pages);
        Inspection {
            pages: self.inspector.page_count(pdf_path).ok(),
            has_text,
            needs_ocr: !has_text && self.ocr.is_some(),
            strategies: self.chain.labels(),
        }
    }

    /// The searchable copy to extract from, if OCR ran and succeeded, and
    /// whether OCR was invoked at all.
    fn ocr_if_needed(&self, pdf_path: &Path) -> Result<(Option<SearchablePdf>, bool), TabellError> {
        if has_selectable_text(self.inspector.as_ref(), pdf_path, self.text_check_pages) {
            return Ok((None, false));
        }

        let Some(engine) = &self.ocr else {
            info!("no selectable text and OCR is disabled");
            return Ok((None, false));
        };

        match ocr_to_searchable_pdf(engine.as_ref(), pdf_path) {
            Ok(searchable) => Ok((Some(searchable), true)),
            Err(e) => match self.on_ocr_failure {
                OcrFailurePolicy::Continue => {
                    warn!(error = %e, "OCR failed, extracting from the original document");
                    Ok((None, true))
                }
                OcrFailurePolicy::Abort => Err(e),
            },
        }
    }
}

/// Convert a PDF with the default configuration, returning the `.xlsx` bytes
/// and what happened.
pub fn convert_pdf_to_excel_with_meta(
    pdf_path: &Path,
) -> Result<(Vec<u8>, ConversionMetadata), TabellError> {
    let conversion = Converter::from_config(&ConversionConfig::default())?.convert(pdf_path)?;
    Ok((conversion.workbook, conversion.metadata))
}

/// Convert a PDF with the default configuration, returning only the `.xlsx` bytes.
pub fn convert_pdf_to_excel(pdf_path: &Path) -> Result<Vec<u8>, TabellError> {
    convert_pdf_to_excel_with_meta(pdf_path).map(|(bytes, _)| bytes)
}
