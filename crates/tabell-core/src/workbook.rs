use rust_xlsxwriter::Workbook;
use tracing::debug;

use crate::error::TabellError;
use crate::model::CleanedTable;

/// Sheet name for the table at 1-based `position`.
pub fn sheet_name(position: usize) -> String {
    format!("Table_{position}")
}

/// Write every table to its own sheet of an in-memory `.xlsx` file.
///
/// Sheets are named `Table_1..Table_N` in order. Promoted headers become the
/// first row; there is no index column. Every cell is written as text and
/// missing cells are left blank.
pub fn write_workbook(tables: &[CleanedTable]) -> Result<Vec<u8>, TabellError> {
    if tables.is_empty() {
        return Err(TabellError::NoTablesFound { attempts: 0 });
    }

    let mut workbook = Workbook::new();

    for (i, table) in tables.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(i + 1))?;

        let mut row: u32 = 0;
        if let Some(headers) = &table.headers {
            for (col, header) in headers.iter().enumerate() {
                sheet.write_string(row, column(col)?, header)?;
            }
            row += 1;
        }

        for cells in &table.rows {
            for (col, cell) in cells.iter().enumerate() {
                if let Some(value) = cell {
                    sheet.write_string(row, column(col)?, value)?;
                }
            }
            row += 1;
        }

        debug!(sheet = i + 1, rows = row, "sheet written");
    }

    Ok(workbook.save_to_buffer()?)
}

fn column(index: usize) -> Result<u16, TabellError> {
    u16::try_from(index).map_err(|_| {
        TabellError::Extraction(format!("table has too many columns ({})", index + 1))
    })
}
