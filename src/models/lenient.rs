//! Forgiving field decoders for vendor JSON.
//!
//! The vendor's records are read field by field with defaults: `null`, a
//! missing field, or a value of an unexpected JSON type all decode to the
//! field's default. Scalars are coerced across types where the meaning is
//! unambiguous (numbers to text, numeric text to numbers, `"true"` to
//! `true`).

use serde::{Deserialize as _, Deserializer};
use serde_json::Value;

/// Upper bound (exclusive) of the `i64` range as an `f64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0_f64;

/// Decodes a text field; non-scalar values become the empty string.
pub(super) fn text<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::from(scalar_text(value).unwrap_or_default()))
}

/// Decodes an optional text field; `null` and non-scalar values are absent.
pub(super) fn optional_text<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).map(T::from))
}

/// Decodes an integer field; unusable values become zero.
pub(super) fn long<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<i64>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::from(scalar_long(value).unwrap_or_default()))
}

/// Decodes a boolean field; unusable values become `false`.
pub(super) fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(flag) => flag,
        Value::String(string) => string.trim().eq_ignore_ascii_case("true"),
        Value::Null | Value::Number(_) | Value::Array(_) | Value::Object(_) => false,
    })
}

/// Renders a scalar as text.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(string) => Some(string),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Reads a scalar as an integer, truncating fractions.
fn scalar_long(value: Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(truncate)),
        Value::String(string) => {
            let trimmed = string.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(truncate))
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Truncates a float toward zero if the result fits in an `i64`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the value is range-checked and truncated first"
)]
fn truncate(number: f64) -> Option<i64> {
    let whole = number.trunc();
    (-I64_BOUND..I64_BOUND)
        .contains(&whole)
        .then_some(whole as i64)
}
