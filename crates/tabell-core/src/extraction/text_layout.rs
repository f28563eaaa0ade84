use crate::extraction::grid::{interval_index, merge_intervals};
use crate::layout::PageContent;
use crate::model::RawTable;

/// A piece of a `pdftotext -layout` line, with its character columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Split a layout line on gaps of two or more whitespace characters.
///
/// Offsets are character columns, which line up across lines because
/// `pdftotext -layout` pads with spaces.
pub fn split_by_whitespace_gaps(line: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start: Option<(usize, usize)> = None; // (byte, column)
    let mut last_end: (usize, usize) = (0, 0);
    let mut space_count = 0;

    for (col, (i, c)) in line.char_indices().enumerate() {
        if c.is_whitespace() {
            space_count += 1;
            if space_count == 2 {
                if let Some((s_byte, s_col)) = start.take() {
                    segments.push(Segment {
                        text: &line[s_byte..last_end.0],
                        start: s_col,
                        end: last_end.1,
                    });
                }
            }
        } else {
            if start.is_none() {
                start = Some((i, col));
            }
            space_count = 0;
            last_end = (i + c.len_utf8(), col + 1);
        }
    }

    if let Some((s_byte, s_col)) = start {
        segments.push(Segment {
            text: &line[s_byte..last_end.0],
            start: s_col,
            end: last_end.1,
        });
    }

    segments
}

/// Find column-aligned blocks in layout text.
///
/// A block is a run of at least `min_rows` consecutive lines that each split
/// into `min_columns` or more segments. Blank lines and single-segment lines
/// end a block.
pub fn text_layout_tables(page: &PageContent, min_columns: usize, min_rows: usize) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut block: Vec<Vec<Segment<'_>>> = Vec::new();

    for line in &page.lines {
        let segments = split_by_whitespace_gaps(line);
        if segments.len() >= min_columns {
            block.push(segments);
            continue;
        }
        tables.extend(block_table(page.page_number, &block, min_rows));
        block.clear();
    }
    tables.extend(block_table(page.page_number, &block, min_rows));

    tables
}

fn block_table(page_number: usize, block: &[Vec<Segment<'_>>], min_rows: usize) -> Option<RawTable> {
    if block.is_empty() || block.len() < min_rows {
        return None;
    }

    let columns = merge_intervals(
        block
            .iter()
            .flatten()
            .map(|s| (s.start as f32, s.end as f32))
            .collect(),
        0.0,
    );

    let rows = block
        .iter()
        .map(|segments| {
            let mut cells: Vec<Option<String>> = vec![None; columns.len()];
            for s in segments {
                let center = (s.start + s.end) as f32 / 2.0;
                if let Some(col) = interval_index(&columns, center) {
                    let cell = cells[col].get_or_insert_with(String::new);
                    if !cell.is_empty() {
                        cell.push(' ');
                    }
                    cell.push_str(s.text);
                }
            }
            cells
        })
        .collect();

    Some(RawTable::new(page_number, rows))
}
