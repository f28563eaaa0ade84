use std::path::Path;

use tabell_core::config::{load_config, ConversionConfig};
use tabell_core::error::TabellError;

use crate::output;

pub fn show() -> Result<(), TabellError> {
    output::json::print(&ConversionConfig::default())
}

pub fn validate(file: &Path) -> Result<(), TabellError> {
    let config = load_config(file)?;
    println!("Valid configuration: {}", file.display());
    println!("  {} extraction strategies", config.strategies.len());
    println!(
        "  OCR: {}",
        if config.ocr.enabled {
            format!("{} ({})", config.ocr.binary, config.ocr.languages.join("+"))
        } else {
            "disabled".to_string()
        }
    );
    Ok(())
}
