use std::ffi::OsStr;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::TabellError;
use crate::layout::{attr_f32, BBox, LayoutSource, PageLayout, Word};
use crate::pdf::run_tool;

/// Word positions from `pdftotext -bbox-layout` (poppler-utils).
pub struct BboxLayoutSource;

impl BboxLayoutSource {
    pub fn new() -> Self {
        BboxLayoutSource
    }
}

impl Default for BboxLayoutSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutSource for BboxLayoutSource {
    fn page_layouts(&self, pdf_path: &Path) -> Result<Vec<PageLayout>, TabellError> {
        let output = run_tool(
            "pdftotext",
            [
                OsStr::new("-bbox-layout"),
                pdf_path.as_os_str(),
                OsStr::new("-"),
            ],
        )?;
        let xml = String::from_utf8_lossy(&output.stdout);
        parse_bbox_xml(&xml)
    }

    fn backend_name(&self) -> &str {
        "pdftotext-bbox"
    }
}

/// Parse the XHTML written by `pdftotext -bbox-layout`.
///
/// Pages carry `width`/`height`; every `<word>` carries its box. Pages are
/// numbered in document order.
pub fn parse_bbox_xml(xml: &str) -> Result<Vec<PageLayout>, TabellError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages = Vec::new();
    let mut current: Option<PageLayout> = None;
    let mut word: Option<(BBox, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => {
                    current = Some(PageLayout {
                        page_number: pages.len() + 1,
                        width: attr_f32(&e, b"width").unwrap_or(0.0),
                        height: attr_f32(&e, b"height").unwrap_or(0.0),
                        words: Vec::new(),
                    });
                }
                b"word" => {
                    word = word_bbox(&e).map(|b| (b, String::new()));
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"page" => {
                pages.push(PageLayout {
                    page_number: pages.len() + 1,
                    width: attr_f32(&e, b"width").unwrap_or(0.0),
                    height: attr_f32(&e, b"height").unwrap_or(0.0),
                    words: Vec::new(),
                });
            }
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = word.as_mut() {
                    let decoded = t
                        .unescape()
                        .map_err(|e| TabellError::Extraction(format!("bbox layout: {e}")))?;
                    text.push_str(&decoded);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"word" => {
                    if let (Some((bbox, text)), Some(page)) = (word.take(), current.as_mut()) {
                        let text = text.trim();
                        if !text.is_empty() {
                            page.words.push(Word::new(text, bbox));
                        }
                    }
                }
                b"page" => {
                    if let Some(page) = current.take() {
                        pages.push(page);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TabellError::Extraction(format!(
                    "bbox layout XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(pages)
}

fn word_bbox(e: &quick_xml::events::BytesStart<'_>) -> Option<BBox> {
    Some(BBox::new(
        attr_f32(e, b"xMin")?,
        attr_f32(e, b"yMin")?,
        attr_f32(e, b"xMax")?,
        attr_f32(e, b"yMax")?,
    ))
}
