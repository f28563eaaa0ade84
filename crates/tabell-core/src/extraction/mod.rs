pub mod chain;
pub mod grid;
pub mod lattice;
pub mod stream;
pub mod text_layout;

use std::path::Path;

use tracing::debug;

use crate::config::{AltMode, StrategyConfig};
use crate::error::TabellError;
use crate::layout::bbox::BboxLayoutSource;
use crate::layout::pdftohtml::PdftohtmlSource;
use crate::layout::rulings::read_rulings;
use crate::layout::LayoutSource;
use crate::model::RawTable;
use crate::pdf::poppler::layout_pages;

pub use chain::{ChainOutcome, StrategyChain};

/// One way of finding tables in a PDF.
pub trait TableStrategy: Send + Sync {
    /// Identifies this configuration in metadata and logs.
    fn label(&self) -> String;

    /// Whether the backing engine exists in this environment.
    fn is_available(&self) -> bool {
        true
    }

    /// Every table found in the document, in page order. An empty result is
    /// not an error.
    fn extract(&self, pdf_path: &Path) -> Result<Vec<RawTable>, TabellError>;
}

/// Ruled-line detection over word positions and drawn rulings.
pub struct LatticeStrategy {
    source: Box<dyn LayoutSource>,
    line_scale: f32,
    label: String,
}

impl LatticeStrategy {
    pub fn new(line_scale: f32) -> Self {
        LatticeStrategy {
            source: Box::new(BboxLayoutSource::new()),
            line_scale,
            label: format!("lattice(line_scale={line_scale})"),
        }
    }

    pub fn with_source(source: Box<dyn LayoutSource>, line_scale: f32, label: String) -> Self {
        LatticeStrategy {
            source,
            line_scale,
            label,
        }
    }
}

impl TableStrategy for LatticeStrategy {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_available(&self) -> bool {
        self.source.is_available()
    }

    fn extract(&self, pdf_path: &Path) -> Result<Vec<RawTable>, TabellError> {
        let layouts = self.source.page_layouts(pdf_path)?;
        debug!(backend = self.source.backend_name(), pages = layouts.len(), "lattice layouts");
        let rulings = read_rulings(pdf_path, &layouts)?;

        Ok(layouts
            .iter()
            .flat_map(|layout| {
                let page_rulings = rulings
                    .get(&layout.page_number)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                lattice::lattice_tables(layout, page_rulings, self.line_scale)
            })
            .filter(RawTable::has_text)
            .collect())
    }
}

/// Whitespace-gap detection over word positions.
pub struct StreamStrategy {
    source: Box<dyn LayoutSource>,
    row_tol: f32,
    column_tol: f32,
    label: String,
}

impl StreamStrategy {
    pub fn new(row_tol: f32, column_tol: f32) -> Self {
        StreamStrategy {
            source: Box::new(BboxLayoutSource::new()),
            row_tol,
            column_tol,
            label: format!("stream(row_tol={row_tol},column_tol={column_tol})"),
        }
    }

    pub fn with_source(
        source: Box<dyn LayoutSource>,
        row_tol: f32,
        column_tol: f32,
        label: String,
    ) -> Self {
        StreamStrategy {
            source,
            row_tol,
            column_tol,
            label,
        }
    }
}

impl TableStrategy for StreamStrategy {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_available(&self) -> bool {
        self.source.is_available()
    }

    fn extract(&self, pdf_path: &Path) -> Result<Vec<RawTable>, TabellError> {
        let layouts = self.source.page_layouts(pdf_path)?;
        debug!(backend = self.source.backend_name(), pages = layouts.len(), "stream layouts");
        Ok(layouts
            .iter()
            .flat_map(|layout| stream::stream_tables(layout, self.row_tol, self.column_tol))
            .filter(RawTable::has_text)
            .collect())
    }
}

/// Column-aligned blocks in `pdftotext -layout` text.
pub struct TextLayoutStrategy {
    min_columns: usize,
    min_rows: usize,
}

impl TextLayoutStrategy {
    pub fn new(min_columns: usize, min_rows: usize) -> Self {
        TextLayoutStrategy {
            min_columns,
            min_rows,
        }
    }
}

impl TableStrategy for TextLayoutStrategy {
    fn label(&self) -> String {
        format!(
            "text_layout(min_columns={},min_rows={})",
            self.min_columns, self.min_rows
        )
    }

    fn extract(&self, pdf_path: &Path) -> Result<Vec<RawTable>, TabellError> {
        let pages = layout_pages(pdf_path)?;
        Ok(pages
            .iter()
            .flat_map(|page| text_layout::text_layout_tables(page, self.min_columns, self.min_rows))
            .filter(RawTable::has_text)
            .collect())
    }
}

/// Build the strategy objects for a configured chain, in order.
pub fn build_strategies(configs: &[StrategyConfig]) -> Vec<Box<dyn TableStrategy>> {
    configs
        .iter()
        .map(|config| -> Box<dyn TableStrategy> {
            match *config {
                StrategyConfig::Lattice { line_scale } => Box::new(LatticeStrategy::new(line_scale)),
                StrategyConfig::Stream { row_tol, column_tol } => {
                    Box::new(StreamStrategy::new(row_tol, column_tol))
                }
                StrategyConfig::TextLayout {
                    min_columns,
                    min_rows,
                } => Box::new(TextLayoutStrategy::new(min_columns, min_rows)),
                StrategyConfig::Alternate {
                    mode: AltMode::Lattice,
                    line_scale,
                    ..
                } => Box::new(LatticeStrategy::with_source(
                    Box::new(PdftohtmlSource::new()),
                    line_scale,
                    format!("pdftohtml-lattice(line_scale={line_scale})"),
                )),
                StrategyConfig::Alternate {
                    mode: AltMode::Stream,
                    row_tol,
                    column_tol,
                    ..
                } => Box::new(StreamStrategy::with_source(
                    Box::new(PdftohtmlSource::new()),
                    row_tol,
                    column_tol,
                    format!("pdftohtml-stream(row_tol={row_tol},column_tol={column_tol})"),
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_strategies;
    use crate::layout::{BBox, PageLayout, Word};

    struct FixedLayout(Vec<PageLayout>);

    impl LayoutSource for FixedLayout {
        fn page_layouts(&self, _pdf_path: &Path) -> Result<Vec<PageLayout>, TabellError> {
            Ok(self.0.clone())
        }

        fn is_available(&self) -> bool {
            false
        }

        fn backend_name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_default_chain_labels() {
        let labels: Vec<String> = build_strategies(&default_strategies())
            .iter()
            .map(|s| s.label())
            .collect();
        assert_eq!(
            labels,
            vec![
                "lattice(line_scale=15)",
                "lattice(line_scale=40)",
                "stream(row_tol=2,column_tol=2)",
                "stream(row_tol=10,column_tol=0)",
                "text_layout(min_columns=2,min_rows=2)",
                "pdftohtml-lattice(line_scale=15)",
                "pdftohtml-stream(row_tol=2,column_tol=2)",
            ]
        );
    }

    #[test]
    fn test_stream_strategy_over_injected_source() {
        let word = |t: &str, x: f32, y: f32| Word::new(t, BBox::new(x, y, x + 20.0, y + 10.0));
        let layout = PageLayout {
            page_number: 2,
            width: 600.0,
            height: 800.0,
            words: vec![
                word("Item", 50.0, 100.0),
                word("Price", 200.0, 100.0),
                word("Apple", 50.0, 114.0),
                word("3,5", 200.0, 114.0),
            ],
        };
        let strategy =
            StreamStrategy::with_source(Box::new(FixedLayout(vec![layout])), 2.0, 2.0, "s".into());
        assert!(!strategy.is_available());
        let tables = strategy.extract(Path::new("unused.pdf")).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page_number, 2);
        assert_eq!(tables[0].rows[1][1].as_deref(), Some("3,5"));
    }
}
