pub mod config;
pub mod convert;
pub mod inspect;

use std::path::Path;

use tabell_core::config::{load_config, ConversionConfig};
use tabell_core::error::TabellError;

/// The configuration file's contents, or the defaults when none is given.
fn effective_config(path: Option<&Path>) -> Result<ConversionConfig, TabellError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ConversionConfig::default()),
    }
}
