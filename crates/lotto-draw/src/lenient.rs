//! Deserializers for provider fields that arrive as numbers or strings.

use serde::{de::Error, Deserialize, Deserializer};
use serde_json::Value;

/// Numbers and numeric strings (`"1,234.00"` included); anything else is 0.
pub(crate) fn f64_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

pub(crate) fn u32_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(f64_from_any(d)?.max(0.0) as u32)
}

/// Strings kept as-is, numbers rendered without a fraction.
pub(crate) fn string_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected string or number, got {other}"))),
    }
}

pub(crate) fn opt_string_from_any<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<String>, D::Error> {
    let s = string_from_any(d)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}
