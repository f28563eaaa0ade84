pub mod cell;
pub mod table;

pub use cell::{default_rules, normalize_cell, CellRule};
pub use table::{clean_table, DEFAULT_HEADER_MAX_CHARS};
