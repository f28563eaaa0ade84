use std::io::Read;
use std::path::{Path, PathBuf};

use tabell_core::error::TabellError;
use tabell_core::pdf::check_pdf_input;
use tabell_core::Converter;

use crate::output;

pub fn run(
    input_file: PathBuf,
    out: Option<PathBuf>,
    config_file: Option<PathBuf>,
    output_format: &str,
    no_ocr: bool,
    max_mb: u64,
) -> Result<(), TabellError> {
    let mut config = super::effective_config(config_file.as_deref())?;
    if no_ocr {
        config.ocr.enabled = false;
    }
    let converter = Converter::from_config(&config)?;

    let from_stdin = input_file.as_os_str() == "-";
    let pdf_bytes = if from_stdin {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(&input_file)?
    };
    check_pdf_input(
        (!from_stdin).then_some(input_file.as_path()),
        &pdf_bytes,
        max_mb.saturating_mul(1024 * 1024),
    )?;

    let conversion = if from_stdin {
        converter.convert_bytes(&pdf_bytes)?
    } else {
        converter.convert(&input_file)?
    };

    let out_path = out.unwrap_or_else(|| default_output_path(&input_file, from_stdin));
    std::fs::write(&out_path, &conversion.workbook)?;

    match output_format {
        "json" => output::json::print(&conversion.metadata)?,
        _ => output::table::print_conversion(&conversion, &out_path),
    }

    Ok(())
}

/// `<input stem>.xlsx` next to the input; `tables.xlsx` for stdin.
fn default_output_path(input_file: &Path, from_stdin: bool) -> PathBuf {
    if from_stdin {
        PathBuf::from("tables.xlsx")
    } else {
        input_file.with_extension("xlsx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("reports/q3 summary.pdf"), false),
            PathBuf::from("reports/q3 summary.xlsx")
        );
        assert_eq!(
            default_output_path(Path::new("-"), true),
            PathBuf::from("tables.xlsx")
        );
    }
}
