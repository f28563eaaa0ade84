use crate::extraction::grid::{interval_index, merge_intervals};
use crate::layout::{BBox, PageLayout, Word};
use crate::model::RawTable;

/// Words closer than this many word heights belong to the same phrase.
const PHRASE_GAP: f32 = 0.8;

/// Rows further apart than this many line heights start a new table.
const ROW_GAP: f32 = 2.5;

/// Minimum rows for a whitespace-separated table.
const MIN_ROWS: usize = 2;

/// A horizontal run of words that reads as one cell.
#[derive(Debug, Clone)]
struct Phrase {
    text: String,
    bbox: BBox,
}

#[derive(Debug)]
struct TextRow {
    y: f32,
    height: f32,
    phrases: Vec<Phrase>,
}

/// Detect whitespace-aligned tables on one page.
///
/// Words whose vertical centers lie within `row_tol` share a text row. Runs
/// of consecutive rows with at least two phrases form a table; column
/// intervals of its phrases are merged when they overlap or lie within
/// `column_tol` of each other.
pub fn stream_tables(layout: &PageLayout, row_tol: f32, column_tol: f32) -> Vec<RawTable> {
    let rows = text_rows(&layout.words, row_tol);

    let mut tables = Vec::new();
    let mut region: Vec<&TextRow> = Vec::new();
    for row in &rows {
        let continues = region.last().is_some_and(|prev| {
            row.y - prev.y <= ROW_GAP * prev.height.max(row.height).max(1.0)
        });
        if row.phrases.len() >= 2 && (region.is_empty() || continues) {
            region.push(row);
            continue;
        }
        tables.extend(region_table(layout.page_number, &region, column_tol));
        region.clear();
        if row.phrases.len() >= 2 {
            region.push(row);
        }
    }
    tables.extend(region_table(layout.page_number, &region, column_tol));

    tables
}

fn region_table(page_number: usize, region: &[&TextRow], column_tol: f32) -> Option<RawTable> {
    if region.len() < MIN_ROWS {
        return None;
    }

    let columns = merge_intervals(
        region
            .iter()
            .flat_map(|r| r.phrases.iter().map(|p| (p.bbox.x_min, p.bbox.x_max)))
            .collect(),
        column_tol,
    );
    if columns.len() < 2 {
        return None;
    }

    let rows = region
        .iter()
        .map(|row| {
            let mut cells: Vec<Option<String>> = vec![None; columns.len()];
            for phrase in &row.phrases {
                if let Some(col) = interval_index(&columns, phrase.bbox.center_x()) {
                    let cell = cells[col].get_or_insert_with(String::new);
                    if !cell.is_empty() {
                        cell.push(' ');
                    }
                    cell.push_str(&phrase.text);
                }
            }
            cells
        })
        .collect();

    Some(RawTable::new(page_number, rows))
}

/// Group words into rows by vertical center, then each row into phrases.
fn text_rows(words: &[Word], row_tol: f32) -> Vec<TextRow> {
    let mut sorted: Vec<&Word> = words.iter().collect();
    sorted.sort_by(|a, b| a.bbox.center_y().total_cmp(&b.bbox.center_y()));

    let mut grouped: Vec<(f32, Vec<&Word>)> = Vec::new();
    for w in sorted {
        let cy = w.bbox.center_y();
        match grouped.last_mut() {
            Some((y, members)) if (cy - *y).abs() <= row_tol => {
                members.push(w);
                *y = members.iter().map(|m| m.bbox.center_y()).sum::<f32>() / members.len() as f32;
            }
            _ => grouped.push((cy, vec![w])),
        }
    }

    grouped
        .into_iter()
        .map(|(y, mut members)| {
            members.sort_by(|a, b| a.bbox.x_min.total_cmp(&b.bbox.x_min));
            let height = members.iter().map(|m| m.bbox.height()).fold(0.0, f32::max);
            TextRow {
                y,
                height,
                phrases: phrases(&members),
            }
        })
        .collect()
}

fn phrases(words: &[&Word]) -> Vec<Phrase> {
    let mut out: Vec<Phrase> = Vec::new();
    for w in words {
        match out.last_mut() {
            Some(p) if w.bbox.x_min - p.bbox.x_max < PHRASE_GAP * w.bbox.height().max(1.0) => {
                p.text.push(' ');
                p.text.push_str(&w.text);
                p.bbox.x_max = p.bbox.x_max.max(w.bbox.x_max);
                p.bbox.y_min = p.bbox.y_min.min(w.bbox.y_min);
                p.bbox.y_max = p.bbox.y_max.max(w.bbox.y_max);
            }
            _ => out.push(Phrase {
                text: w.text.clone(),
                bbox: w.bbox,
            }),
        }
    }
    out
}
