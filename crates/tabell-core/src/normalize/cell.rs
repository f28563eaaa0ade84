use serde::{Deserialize, Serialize};

/// One numeric clean-up rule. Rules are tried in order and the first one that
/// matches decides the cell's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CellRule {
    /// `<number>[,.<fraction>] <suffix>` -> bare number with a period separator.
    /// Suffixes compare ASCII case-insensitively, e.g. `"27,847p"` -> `"27.847"`.
    StripUnitSuffix { suffixes: Vec<String> },
    /// `<number>,<fraction>` -> `<number>.<fraction>`, e.g. `"3,5"` -> `"3.5"`.
    DecimalComma,
}

impl CellRule {
    pub fn apply(&self, value: &str) -> Option<String> {
        match self {
            CellRule::StripUnitSuffix { suffixes } => suffixes
                .iter()
                .find_map(|suffix| strip_suffix_ignore_case(value, suffix))
                .map(str::trim_end)
                .filter(|stem| is_plain_number(stem))
                .map(to_period_separator),
            CellRule::DecimalComma => {
                if is_plain_number(value) {
                    Some(to_period_separator(value))
                } else {
                    None
                }
            }
        }
    }
}

/// The rules used when none are configured: minor-unit `p` suffix, then decimal comma.
pub fn default_rules() -> Vec<CellRule> {
    vec![
        CellRule::StripUnitSuffix {
            suffixes: vec!["p".into()],
        },
        CellRule::DecimalComma,
    ]
}

/// Normalize one extracted cell.
///
/// Missing and empty values pass through. Otherwise line breaks and runs of
/// whitespace collapse to a single space, the ends are trimmed, and the first
/// matching rule rewrites numeric values.
pub fn normalize_cell(value: Option<&str>, rules: &[CellRule]) -> Option<String> {
    let raw = value?;
    if raw.is_empty() {
        return Some(String::new());
    }

    let collapsed = collapse_whitespace(raw);
    let normalized = rules
        .iter()
        .find_map(|rule| rule.apply(&collapsed))
        .unwrap_or(collapsed);
    Some(normalized)
}

/// Collapse newlines and whitespace runs into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Matches `-?\d+([.,]\d+)?`.
pub fn is_plain_number(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match digits.find([',', '.']) {
        Some(idx) => (&digits[..idx], Some(&digits[idx + 1..])),
        None => (digits, None),
    };

    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.map_or(true, all_digits)
}

fn to_period_separator(s: &str) -> String {
    s.replace(',', ".")
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    if suffix.is_empty() || value.len() <= suffix.len() {
        return None;
    }
    let split = value.len() - suffix.len();
    if !value.is_char_boundary(split) {
        return None;
    }
    let (stem, tail) = value.split_at(split);
    if tail.eq_ignore_ascii_case(suffix) {
        Some(stem)
    } else {
        None
    }
}
