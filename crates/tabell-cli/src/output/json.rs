use serde::Serialize;
use tabell_core::error::TabellError;

pub fn print<T: Serialize>(value: &T) -> Result<(), TabellError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
