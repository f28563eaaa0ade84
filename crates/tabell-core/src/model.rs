use serde::{Deserialize, Serialize};
use std::fmt;

/// A grid of optional cell values as returned by one extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    /// 1-based page the table was found on.
    pub page_number: usize,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(page_number: usize, rows: Vec<Vec<Option<String>>>) -> Self {
        RawTable { page_number, rows }
    }

    /// Build a table from string literals, mapping `""` to a missing cell.
    pub fn from_strings(page_number: usize, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        if cell.is_empty() {
                            None
                        } else {
                            Some(cell.to_string())
                        }
                    })
                    .collect()
            })
            .collect();
        RawTable { page_number, rows }
    }

    /// Whether at least one cell carries non-blank text.
    pub fn has_text(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .any(|c| c.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// A table after cell normalization, pruning and header promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedTable {
    pub page_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl CleanedTable {
    pub fn column_count(&self) -> usize {
        let from_rows = self.rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let from_headers = self.headers.as_ref().map(|h| h.len()).unwrap_or(0);
        from_rows.max(from_headers)
    }

    /// Promoted headers, or positional labels for headerless tables.
    pub fn column_labels(&self) -> Vec<String> {
        match &self.headers {
            Some(h) => h.clone(),
            None => (1..=self.column_count())
                .map(|i| format!("Column {i}"))
                .collect(),
        }
    }
}

/// What happened when the chain tried one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Tables { count: usize },
    Empty,
    Failed { reason: String },
    Unavailable,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Tables { count } => write!(f, "{count} table(s)"),
            AttemptOutcome::Empty => write!(f, "empty"),
            AttemptOutcome::Failed { reason } => write!(f, "failed: {reason}"),
            AttemptOutcome::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Metadata reported alongside the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMetadata {
    /// Label of the strategy that produced the tables.
    pub extractor: String,
    /// Page count of the final source document; `None` when it could not be read.
    pub pages: Option<usize>,
    pub ocr_used: bool,
    pub tables_found: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<StrategyAttempt>,
}

/// Output of a successful conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub workbook: Vec<u8>,
    pub metadata: ConversionMetadata,
    pub tables: Vec<CleanedTable>,
}

/// What a document looks like before conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    pub pages: Option<usize>,
    pub has_text: bool,
    /// Whether a conversion would run OCR first.
    pub needs_ocr: bool,
    /// Strategy labels in the order they would be tried.
    pub strategies: Vec<String>,
}
