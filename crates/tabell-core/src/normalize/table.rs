use std::collections::HashSet;

use crate::model::{CleanedTable, RawTable};
use crate::normalize::cell::{normalize_cell, CellRule};

/// Default maximum header length, in characters.
pub const DEFAULT_HEADER_MAX_CHARS: usize = 60;

/// Clean one raw table.
///
/// 1. Normalize every cell.
/// 2. Treat empty and all-whitespace cells as missing.
/// 3. Drop rows, then columns, that are entirely missing.
/// 4. Promote the first remaining row to headers when its trimmed values are
///    pairwise distinct (case-sensitive, missing counts as `""`).
///
/// Header promotion is a heuristic: a first data row with distinct values is
/// promoted just like a real header, and a real header with a repeated label
/// is left in the data.
pub fn clean_table(raw: &RawTable, rules: &[CellRule], header_max_chars: usize) -> CleanedTable {
    let width = raw.rows.iter().map(|r| r.len()).max().unwrap_or(0);

    let mut rows: Vec<Vec<Option<String>>> = raw
        .rows
        .iter()
        .map(|row| {
            (0..width)
                .map(|col| {
                    let cell = row.get(col).and_then(|c| c.as_deref());
                    normalize_cell(cell, rules).filter(|s| !s.trim().is_empty())
                })
                .collect()
        })
        .filter(|row: &Vec<Option<String>>| row.iter().any(Option::is_some))
        .collect();

    let keep: Vec<usize> = (0..width)
        .filter(|&col| rows.iter().any(|row| row[col].is_some()))
        .collect();
    if keep.len() < width {
        rows = rows
            .into_iter()
            .map(|row| keep.iter().map(|&col| row[col].clone()).collect())
            .collect();
    }

    let promote = rows.first().is_some_and(|first| has_distinct_values(first));
    let headers = if promote {
        let first = rows.remove(0);
        Some(
            first
                .into_iter()
                .map(|cell| truncate_chars(cell.unwrap_or_default().trim(), header_max_chars))
                .collect(),
        )
    } else {
        None
    };

    CleanedTable {
        page_number: raw.page_number,
        headers,
        rows,
    }
}

fn has_distinct_values(row: &[Option<String>]) -> bool {
    let mut seen = HashSet::new();
    row.iter()
        .all(|cell| seen.insert(cell.as_deref().map(str::trim).unwrap_or("")))
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::cell::default_rules;

    fn clean(rows: &[&[&str]]) -> CleanedTable {
        clean_table(
            &RawTable::from_strings(1, rows),
            &default_rules(),
            DEFAULT_HEADER_MAX_CHARS,
        )
    }

    fn some(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_header_promoted_when_distinct() {
        let t = clean(&[&["Item", "Price"], &["Apple", "3,5"], &["Pear", "27,847p"]]);
        assert_eq!(t.headers, Some(vec!["Item".to_string(), "Price".to_string()]));
        assert_eq!(t.rows, vec![some(&["Apple", "3.5"]), some(&["Pear", "27.847"])]);
    }

    #[test]
    fn test_duplicate_header_not_promoted() {
        let t = clean(&[&["Date", "Amount", "Date"], &["2024-01-01", "10", "x"]]);
        assert!(t.headers.is_none());
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.column_labels(), vec!["Column 1", "Column 2", "Column 3"]);
    }

    #[test]
    fn test_header_uniqueness_is_case_sensitive() {
        let t = clean(&[&["date", "Date"], &["1", "2"]]);
        assert_eq!(t.headers, Some(vec!["date".to_string(), "Date".to_string()]));
    }

    #[test]
    fn test_blank_rows_and_columns_dropped() {
        let t = clean(&[
            &["", "   ", ""],
            &["A", "", "B"],
            &["\n", "", " "],
            &["1", "", "2"],
        ]);
        assert_eq!(t.headers, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(t.rows, vec![some(&["1", "2"])]);
    }

    #[test]
    fn test_two_missing_header_cells_block_promotion() {
        let t = clean(&[&["A", "", ""], &["1", "2", "3"]]);
        assert!(t.headers.is_none());
        assert_eq!(t.rows[0], vec![Some("A".to_string()), None, None]);
    }

    #[test]
    fn test_header_truncated_to_max_chars() {
        let long = "å".repeat(80);
        let t = clean(&[&[long.as_str(), "B"], &["1", "2"]]);
        let headers = t.headers.unwrap();
        assert_eq!(headers[0].chars().count(), 60);
        assert_eq!(headers[1], "B");
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let raw = RawTable::new(
            2,
            vec![
                vec![Some("x".into())],
                vec![Some("a".into()), Some("b".into()), Some("c".into())],
            ],
        );
        let t = clean_table(&raw, &default_rules(), DEFAULT_HEADER_MAX_CHARS);
        assert_eq!(t.page_number, 2);
        // the padded first row has two missing cells, so it stays data
        assert!(t.headers.is_none());
        assert_eq!(t.rows[0], vec![Some("x".to_string()), None, None]);
        assert_eq!(t.column_count(), 3);
    }

    #[test]
    fn test_empty_table_stays_empty() {
        let t = clean(&[&["", ""], &[" ", ""]]);
        assert!(t.headers.is_none());
        assert!(t.rows.is_empty());
        assert_eq!(t.column_count(), 0);
    }
}
