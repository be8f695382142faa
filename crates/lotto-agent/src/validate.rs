//! Validation of generated number combinations.
//!
//! A combination is `<main>+<secondary>`, each group a comma-separated list
//! of zero-padded two-digit values in ascending order. Checks run in a fixed
//! order and the first failure is reported.

use std::collections::HashSet;
use std::fmt;

use lotto_core::{GroupRule, LotteryFormat};

/// Opening and closing markers the backend wraps each combination in.
pub const OPEN_MARKER: &str = "<NUMBER>";
pub const CLOSE_MARKER: &str = "</NUMBER>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Main,
    Secondary,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Main => write!(f, "main"),
            Group::Secondary => write!(f, "secondary"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no <NUMBER> marker in response")]
    MissingMarker,

    #[error("expected '<main>+<secondary>', got '{0}'")]
    Shape(String),

    #[error("{group} group has {actual} numbers, expected {expected}")]
    Count {
        group: Group,
        expected: usize,
        actual: usize,
    },

    #[error("'{token}' in the {group} group is not a two-digit number")]
    Format { group: Group, token: String },

    #[error("{group} group is not in ascending order")]
    Order { group: Group },

    #[error("{value:02} in the {group} group is outside {min:02}-{max:02}")]
    Range {
        group: Group,
        value: u8,
        min: u8,
        max: u8,
    },

    #[error("{value:02} appears more than once in the {group} group")]
    Duplicate { group: Group, value: u8 },
}

/// Contents of every `<NUMBER>...</NUMBER>` span, in order.
pub fn extract_marked(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(OPEN_MARKER) {
        let after = &rest[start + OPEN_MARKER.len()..];
        match after.find(CLOSE_MARKER) {
            Some(end) => {
                out.push(after[..end].trim());
                rest = &after[end + CLOSE_MARKER.len()..];
            }
            None => break,
        }
    }
    out
}

/// Validate one combination against a format, returning it normalized
/// (surrounding and inner whitespace removed).
pub fn validate(format: &LotteryFormat, text: &str) -> Result<String, ValidationError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    // (a) shape
    let (main, secondary) = match compact.split_once('+') {
        Some((m, s)) if !m.is_empty() && !s.is_empty() && !s.contains('+') => (m, s),
        _ => return Err(ValidationError::Shape(text.trim().to_string())),
    };
    let main: Vec<&str> = main.split(',').collect();
    let secondary: Vec<&str> = secondary.split(',').collect();

    // (b) cardinality
    check_count(Group::Main, &format.main, &main)?;
    check_count(Group::Secondary, &format.secondary, &secondary)?;

    // (c) two-digit, ascending
    let main_values = parse_ascending(Group::Main, &main)?;
    let secondary_values = parse_ascending(Group::Secondary, &secondary)?;

    // (d) range
    check_range(Group::Main, &format.main, &main_values)?;
    check_range(Group::Secondary, &format.secondary, &secondary_values)?;

    // (e) distinct
    check_distinct(Group::Main, &main_values)?;
    check_distinct(Group::Secondary, &secondary_values)?;

    Ok(compact)
}

fn check_count(group: Group, rule: &GroupRule, tokens: &[&str]) -> Result<(), ValidationError> {
    if tokens.len() != rule.count {
        return Err(ValidationError::Count {
            group,
            expected: rule.count,
            actual: tokens.len(),
        });
    }
    Ok(())
}

fn parse_ascending(group: Group, tokens: &[&str]) -> Result<Vec<u8>, ValidationError> {
    let mut values = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::Format {
                group,
                token: token.to_string(),
            });
        }
        let value: u8 = token.parse().map_err(|_| ValidationError::Format {
            group,
            token: token.to_string(),
        })?;
        // Equal neighbours are left for the duplicate check.
        if values.last().is_some_and(|prev| *prev > value) {
            return Err(ValidationError::Order { group });
        }
        values.push(value);
    }
    Ok(values)
}

fn check_range(group: Group, rule: &GroupRule, values: &[u8]) -> Result<(), ValidationError> {
    match values.iter().find(|v| !rule.contains(**v)) {
        Some(value) => Err(ValidationError::Range {
            group,
            value: *value,
            min: rule.min,
            max: rule.max,
        }),
        None => Ok(()),
    }
}

fn check_distinct(group: Group, values: &[u8]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    match values.iter().find(|v| !seen.insert(**v)) {
        Some(value) => Err(ValidationError::Duplicate {
            group,
            value: *value,
        }),
        None => Ok(()),
    }
}
