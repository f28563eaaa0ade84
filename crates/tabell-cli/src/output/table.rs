use std::path::Path;

use tabell_core::model::{CleanedTable, Conversion, ConversionMetadata, Inspection};
use tabell_core::workbook::sheet_name;

/// Preview rows shown per table.
const PREVIEW_ROWS: usize = 3;

/// Preview cell width in characters.
const CELL_WIDTH: usize = 16;

pub fn print_conversion(conversion: &Conversion, out_path: &Path) {
    println!("{}", summary_line(&conversion.metadata));
    println!("Extractor: {}", conversion.metadata.extractor);
    println!("Written to {}\n", out_path.display());

    for (i, table) in conversion.tables.iter().enumerate() {
        print_table(&sheet_name(i + 1), table);
    }
}

pub fn print_inspection(inspection: &Inspection) {
    let pages = inspection
        .pages
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".into());
    println!("Pages: {pages}");
    println!("Selectable text: {}", yes_no(inspection.has_text));
    println!("OCR before extraction: {}", yes_no(inspection.needs_ocr));
    println!("\nExtraction chain:");
    for (i, label) in inspection.strategies.iter().enumerate() {
        println!("  {}. {label}", i + 1);
    }
}

/// `Tables: N • Pages: P • OCR: Yes/No`
pub fn summary_line(meta: &ConversionMetadata) -> String {
    let pages = meta
        .pages
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".into());
    format!(
        "Tables: {} • Pages: {} • OCR: {}",
        meta.tables_found,
        pages,
        yes_no(meta.ocr_used)
    )
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn print_table(name: &str, table: &CleanedTable) {
    println!(
        "=== {name} (page {}, {} columns x {} rows) ===",
        table.page_number,
        table.column_count(),
        table.rows.len()
    );

    let labels = table.column_labels();
    println!("  {}", format_row(labels.iter().map(|l| Some(l.as_str()))));
    for row in table.rows.iter().take(PREVIEW_ROWS) {
        println!("  {}", format_row(row.iter().map(|c| c.as_deref())));
    }
    if table.rows.len() > PREVIEW_ROWS {
        println!("  ... {} more row(s)", table.rows.len() - PREVIEW_ROWS);
    }
    println!();
}

fn format_row<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> String {
    cells
        .map(|c| {
            let text = c.unwrap_or("").replace('\n', " ");
            let clipped: String = if text.chars().count() > CELL_WIDTH {
                let mut s: String = text.chars().take(CELL_WIDTH - 1).collect();
                s.push('…');
                s
            } else {
                text
            };
            format!("{clipped:<width$}", width = CELL_WIDTH)
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
