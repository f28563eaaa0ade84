use std::path::{Path, PathBuf};

use tabell_core::error::TabellError;
use tabell_core::Converter;

use crate::output;

pub fn run(
    input_file: &Path,
    config_file: Option<PathBuf>,
    output_format: &str,
) -> Result<(), TabellError> {
    let config = super::effective_config(config_file.as_deref())?;
    let converter = Converter::from_config(&config)?;
    let inspection = converter.inspect(input_file);

    match output_format {
        "json" => output::json::print(&inspection)?,
        _ => output::table::print_inspection(&inspection),
    }
    Ok(())
}
