use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TabellError;
use crate::normalize::{default_rules, CellRule, DEFAULT_HEADER_MAX_CHARS};

/// Everything that shapes a conversion, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Pages inspected by the text-presence check.
    pub text_check_pages: usize,
    pub ocr: OcrConfig,
    /// Extraction strategies, tried in order until one finds tables.
    pub strategies: Vec<StrategyConfig>,
    /// Cell rewrite rules; the first matching rule wins.
    pub cell_rules: Vec<CellRule>,
    pub header_max_chars: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            text_check_pages: 3,
            ocr: OcrConfig::default(),
            strategies: default_strategies(),
            cell_rules: default_rules(),
            header_max_chars: DEFAULT_HEADER_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    pub binary: String,
    pub mode: OcrMode,
    pub deskew: bool,
    pub optimize: u8,
    pub languages: Vec<String>,
    pub timeout_secs: u64,
    pub on_failure: OcrFailurePolicy,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            enabled: true,
            binary: "ocrmypdf".into(),
            mode: OcrMode::SkipText,
            deskew: true,
            optimize: 1,
            languages: vec!["swe".into(), "eng".into()],
            timeout_secs: 300,
            on_failure: OcrFailurePolicy::Continue,
        }
    }
}

/// How the OCR engine treats pages that already carry text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrMode {
    /// Leave text pages alone, recognize image-only pages.
    SkipText,
    /// Rasterize and recognize every page.
    Force,
    /// Replace an existing OCR layer.
    Redo,
}

/// What a failed OCR pass does to the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrFailurePolicy {
    /// Log the failure and extract from the original document.
    Continue,
    /// Fail the conversion with the OCR error.
    Abort,
}

/// One entry of the extraction chain, tagged by `flavor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flavor", rename_all = "snake_case")]
pub enum StrategyConfig {
    Lattice {
        line_scale: f32,
    },
    Stream {
        row_tol: f32,
        column_tol: f32,
    },
    TextLayout {
        min_columns: usize,
        min_rows: usize,
    },
    /// Same detectors on the layout of a second engine (pdftohtml).
    Alternate {
        mode: AltMode,
        #[serde(default = "default_line_scale")]
        line_scale: f32,
        #[serde(default = "default_row_tol")]
        row_tol: f32,
        #[serde(default = "default_column_tol")]
        column_tol: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AltMode {
    Lattice,
    Stream,
}

fn default_line_scale() -> f32 {
    15.0
}

fn default_row_tol() -> f32 {
    2.0
}

fn default_column_tol() -> f32 {
    2.0
}

/// Ruled-line detection first, strict then lenient, then whitespace
/// detection, the layout-text fallback and finally the alternate engine.
pub fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::Lattice { line_scale: 15.0 },
        StrategyConfig::Lattice { line_scale: 40.0 },
        StrategyConfig::Stream {
            row_tol: 2.0,
            column_tol: 2.0,
        },
        StrategyConfig::Stream {
            row_tol: 10.0,
            column_tol: 0.0,
        },
        StrategyConfig::TextLayout {
            min_columns: 2,
            min_rows: 2,
        },
        StrategyConfig::Alternate {
            mode: AltMode::Lattice,
            line_scale: default_line_scale(),
            row_tol: default_row_tol(),
            column_tol: default_column_tol(),
        },
        StrategyConfig::Alternate {
            mode: AltMode::Stream,
            line_scale: default_line_scale(),
            row_tol: default_row_tol(),
            column_tol: default_column_tol(),
        },
    ]
}

/// Load a configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<ConversionConfig, TabellError> {
    let content = std::fs::read_to_string(path).map_err(|e| TabellError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&content, path)
}

/// Parse a configuration from a JSON string. Missing fields take defaults.
pub fn parse_config(json: &str, source: &Path) -> Result<ConversionConfig, TabellError> {
    let config: ConversionConfig =
        serde_json::from_str(json).map_err(|e| TabellError::ConfigLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate that a configuration is usable.
pub fn validate_config(config: &ConversionConfig) -> Result<(), TabellError> {
    if config.text_check_pages == 0 {
        return Err(TabellError::ConfigInvalid(
            "text_check_pages must be at least 1".into(),
        ));
    }

    if config.strategies.is_empty() {
        return Err(TabellError::ConfigInvalid(
            "strategies must not be empty".into(),
        ));
    }

    for (i, strategy) in config.strategies.iter().enumerate() {
        validate_strategy(strategy).map_err(|reason| {
            TabellError::ConfigInvalid(format!("strategy {} ({reason})", i + 1))
        })?;
    }

    if config.cell_rules.is_empty() {
        return Err(TabellError::ConfigInvalid(
            "cell_rules must not be empty".into(),
        ));
    }

    for rule in &config.cell_rules {
        if let CellRule::StripUnitSuffix { suffixes } = rule {
            if suffixes.is_empty() || suffixes.iter().any(|s| s.trim().is_empty()) {
                return Err(TabellError::ConfigInvalid(
                    "strip_unit_suffix needs at least one non-blank suffix".into(),
                ));
            }
        }
    }

    if config.header_max_chars == 0 {
        return Err(TabellError::ConfigInvalid(
            "header_max_chars must be at least 1".into(),
        ));
    }

    validate_ocr(&config.ocr)
}

fn validate_ocr(ocr: &OcrConfig) -> Result<(), TabellError> {
    if ocr.binary.trim().is_empty() {
        return Err(TabellError::ConfigInvalid("ocr.binary must not be empty".into()));
    }

    if ocr.timeout_secs == 0 {
        return Err(TabellError::ConfigInvalid(
            "ocr.timeout_secs must be at least 1".into(),
        ));
    }

    if ocr.optimize > 3 {
        return Err(TabellError::ConfigInvalid(format!(
            "ocr.optimize must be 0-3, got {}",
            ocr.optimize
        )));
    }

    if ocr.languages.is_empty() {
        return Err(TabellError::ConfigInvalid(
            "ocr.languages must not be empty".into(),
        ));
    }

    for lang in &ocr.languages {
        if lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TabellError::ConfigInvalid(format!(
                "invalid OCR language code '{lang}'"
            )));
        }
    }

    Ok(())
}

fn validate_strategy(strategy: &StrategyConfig) -> Result<(), String> {
    let check_scale = |line_scale: f32| {
        if line_scale.is_finite() && line_scale > 0.0 {
            Ok(())
        } else {
            Err(format!("line_scale must be positive, got {line_scale}"))
        }
    };
    let check_tol = |name: &str, tol: f32| {
        if tol.is_finite() && tol >= 0.0 {
            Ok(())
        } else {
            Err(format!("{name} must be non-negative, got {tol}"))
        }
    };

    match *strategy {
        StrategyConfig::Lattice { line_scale } => check_scale(line_scale),
        StrategyConfig::Stream { row_tol, column_tol } => {
            check_tol("row_tol", row_tol)?;
            check_tol("column_tol", column_tol)
        }
        StrategyConfig::TextLayout {
            min_columns,
            min_rows,
        } => {
            if min_columns < 2 {
                return Err(format!("min_columns must be at least 2, got {min_columns}"));
            }
            if min_rows == 0 {
                return Err("min_rows must be at least 1".into());
            }
            Ok(())
        }
        StrategyConfig::Alternate {
            line_scale,
            row_tol,
            column_tol,
            ..
        } => {
            check_scale(line_scale)?;
            check_tol("row_tol", row_tol)?;
            check_tol("column_tol", column_tol)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ConversionConfig, TabellError> {
        parse_config(json, Path::new("test.json"))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ConversionConfig::default();
        validate_config(&config).unwrap();
        assert_eq!(config.strategies.len(), 7);
        assert_eq!(config.strategies[0], StrategyConfig::Lattice { line_scale: 15.0 });
        assert_eq!(config.ocr.on_failure, OcrFailurePolicy::Continue);
        assert_eq!(config.ocr.languages, vec!["swe", "eng"]);
    }

    #[test]
    fn test_empty_object_gives_defaults() {
        assert_eq!(parse("{}").unwrap(), ConversionConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = parse(
            r#"{
                "ocr": { "enabled": false, "on_failure": "abort" },
                "strategies": [
                    { "flavor": "stream", "row_tol": 4, "column_tol": 1 },
                    { "flavor": "alternate", "mode": "lattice" }
                ]
            }"#,
        )
        .unwrap();
        assert!(!config.ocr.enabled);
        assert_eq!(config.ocr.on_failure, OcrFailurePolicy::Abort);
        assert_eq!(config.ocr.timeout_secs, 300);
        assert_eq!(
            config.strategies[0],
            StrategyConfig::Stream {
                row_tol: 4.0,
                column_tol: 1.0
            }
        );
        assert_eq!(
            config.strategies[1],
            StrategyConfig::Alternate {
                mode: AltMode::Lattice,
                line_scale: 15.0,
                row_tol: 2.0,
                column_tol: 2.0
            }
        );
    }

    #[test]
    fn test_json_round_trip_of_defaults() {
        let json = serde_json::to_string(&ConversionConfig::default()).unwrap();
        assert!(json.contains(r#""flavor":"lattice""#));
        assert_eq!(parse(&json).unwrap(), ConversionConfig::default());
    }

    #[test]
    fn test_unknown_flavor_is_load_error() {
        let err = parse(r#"{ "strategies": [ { "flavor": "magic" } ] }"#).unwrap_err();
        assert!(matches!(err, TabellError::ConfigLoad { .. }));
    }

    #[test]
    fn test_empty_chain_rejected() {
        let err = parse(r#"{ "strategies": [] }"#).unwrap_err();
        assert!(matches!(err, TabellError::ConfigInvalid(_)));
    }

    #[test]
    fn test_bad_strategy_parameters_rejected() {
        for json in [
            r#"{ "strategies": [ { "flavor": "lattice", "line_scale": 0 } ] }"#,
            r#"{ "strategies": [ { "flavor": "stream", "row_tol": -1, "column_tol": 0 } ] }"#,
            r#"{ "strategies": [ { "flavor": "text_layout", "min_columns": 1, "min_rows": 2 } ] }"#,
            r#"{ "strategies": [ { "flavor": "text_layout", "min_columns": 2, "min_rows": 0 } ] }"#,
        ] {
            let err = parse(json).unwrap_err();
            assert!(matches!(err, TabellError::ConfigInvalid(_)), "{json}");
        }
    }

    #[test]
    fn test_bad_ocr_settings_rejected() {
        for json in [
            r#"{ "ocr": { "timeout_secs": 0 } }"#,
            r#"{ "ocr": { "optimize": 4 } }"#,
            r#"{ "ocr": { "languages": [] } }"#,
            r#"{ "ocr": { "languages": ["eng; rm -rf"] } }"#,
        ] {
            assert!(parse(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_empty_suffix_list_rejected() {
        let err = parse(r#"{ "cell_rules": [ { "rule": "strip_unit_suffix", "suffixes": [] } ] }"#)
            .unwrap_err();
        assert!(matches!(err, TabellError::ConfigInvalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/tabell.json")).unwrap_err();
        assert!(matches!(err, TabellError::ConfigLoad { .. }));
    }
}
