use std::ffi::OsStr;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::TabellError;
use crate::layout::{attr_f32, attr_value, BBox, LayoutSource, PageLayout, Word};
use crate::pdf::{run_tool, tool_available};

/// Text fragments from `pdftohtml -xml` (poppler-utils), used by the
/// alternate engine. Fragments are coarser than words: one fragment is a run
/// of text the renderer kept together, often a whole cell.
pub struct PdftohtmlSource {
    binary: String,
}

impl PdftohtmlSource {
    pub fn new() -> Self {
        PdftohtmlSource {
            binary: "pdftohtml".into(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        PdftohtmlSource {
            binary: binary.into(),
        }
    }
}

impl Default for PdftohtmlSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutSource for PdftohtmlSource {
    fn page_layouts(&self, pdf_path: &Path) -> Result<Vec<PageLayout>, TabellError> {
        let out_dir = tempfile::tempdir()?;
        let out_base = out_dir.path().join("layout");

        run_tool(
            &self.binary,
            [
                OsStr::new("-xml"),
                OsStr::new("-i"),
                OsStr::new("-q"),
                OsStr::new("-zoom"),
                OsStr::new("1"),
                pdf_path.as_os_str(),
                out_base.as_os_str(),
            ],
        )?;

        let xml = std::fs::read_to_string(out_base.with_extension("xml"))?;
        parse_pdf2xml(&xml)
    }

    fn is_available(&self) -> bool {
        tool_available(&self.binary)
    }

    fn backend_name(&self) -> &str {
        "pdftohtml"
    }
}

/// Parse `pdf2xml` output. Coordinates are taken at zoom 1, i.e. in points.
pub fn parse_pdf2xml(xml: &str) -> Result<Vec<PageLayout>, TabellError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut pages = Vec::new();
    let mut current: Option<PageLayout> = None;
    let mut fragment: Option<(BBox, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => {
                    let page_number = attr_value(&e, b"number")
                        .and_then(|n| n.parse().ok())
                        .unwrap_or(pages.len() + 1);
                    current = Some(PageLayout {
                        page_number,
                        width: attr_f32(&e, b"width").unwrap_or(0.0),
                        height: attr_f32(&e, b"height").unwrap_or(0.0),
                        words: Vec::new(),
                    });
                }
                b"text" => {
                    fragment = fragment_bbox(&e).map(|b| (b, String::new()));
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = fragment.as_mut() {
                    let decoded = t
                        .unescape()
                        .map_err(|e| TabellError::Extraction(format!("pdf2xml: {e}")))?;
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&decoded);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"text" => {
                    if let (Some((bbox, text)), Some(page)) = (fragment.take(), current.as_mut()) {
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
                    "pdf2xml at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(pages)
}

fn fragment_bbox(e: &quick_xml::events::BytesStart<'_>) -> Option<BBox> {
    let top = attr_f32(e, b"top")?;
    let left = attr_f32(e, b"left")?;
    let width = attr_f32(e, b"width")?;
    let height = attr_f32(e, b"height")?;
    Some(BBox::new(left, top, left + width, top + height))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE pdf2xml SYSTEM "pdf2xml.dtd">
<pdf2xml producer="poppler" version="24.02.0">
<page number="1" position="absolute" top="0" left="0" height="842" width="595">
	<fontspec id="0" size="12" family="Times" color="#000000"/>
<text top="100" left="72" width="40" height="12" font="0"><b>Item</b></text>
<text top="100" left="300" width="36" height="12" font="0">Price</text>
<text top="118" left="72" width="60" height="12" font="0">Apple &amp; pear</text>
</page>
<page number="2" position="absolute" top="0" left="0" height="842" width="595">
</page>
</pdf2xml>
"##;

    #[test]
    fn test_parse_fragments() {
        let pages = parse_pdf2xml(SAMPLE).unwrap();
        assert_eq!(pages.len(), 2);
        let first = &pages[0];
        assert_eq!(first.width, 595.0);
        assert_eq!(first.words.len(), 3);
        assert_eq!(first.words[0].text, "Item");
        assert_eq!(first.words[0].bbox, BBox::new(72.0, 100.0, 112.0, 112.0));
        assert_eq!(first.words[2].text, "Apple & pear");
        assert_eq!(pages[1].page_number, 2);
    }

    #[test]
    fn test_unavailable_binary() {
        let source = PdftohtmlSource::with_binary("tabell-no-such-pdftohtml");
        assert!(!source.is_available());
    }
}
