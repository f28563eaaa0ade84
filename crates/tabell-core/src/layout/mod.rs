pub mod bbox;
pub mod pdftohtml;
pub mod rulings;

use std::path::Path;

use crate::error::TabellError;

/// Axis-aligned box in page space: points, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        BBox {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.x_min + self.x_max) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y_min + self.y_max) / 2.0
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }
}

/// A positioned run of text: a word, or a text fragment for sources that
/// do not split words.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub bbox: BBox,
}

impl Word {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Word {
            text: text.into(),
            bbox,
        }
    }
}

/// Positioned text of a single page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_number: usize,
    pub width: f32,
    pub height: f32,
    pub words: Vec<Word>,
}

/// Monospace text of a single page, as rendered by `pdftotext -layout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub page_number: usize,
    pub lines: Vec<String>,
}

/// A backend that yields positioned words for every page of a PDF.
pub trait LayoutSource: Send + Sync {
    fn page_layouts(&self, pdf_path: &Path) -> Result<Vec<PageLayout>, TabellError>;

    fn is_available(&self) -> bool {
        true
    }

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Attribute lookup shared by the XML layout parsers.
pub(crate) fn attr_value(
    e: &quick_xml::events::BytesStart<'_>,
    name: &[u8],
) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

pub(crate) fn attr_f32(e: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Option<f32> {
    attr_value(e, name)?.trim().parse().ok()
}
