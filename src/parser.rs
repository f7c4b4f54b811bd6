//! Structural decoding of vendor JSON payloads.
//!
//! The parser never judges authenticity. Missing, `null` or mistyped fields
//! fall back to defaults (empty strings, zero, `false`, an absent order id,
//! and [`PurchaseState::Canceled`](crate::models::PurchaseState::Canceled)
//! for the purchase state). Numeric text is accepted for numeric fields.
//! Malformed JSON is the only hard failure.

use serde::de::DeserializeOwned;

use crate::error::{KinAppError, Result};
use crate::models::{Product, Purchase};

/// Decodes a raw SKU details blob.
///
/// # Errors
///
/// Returns [`KinAppError::Parse`] for malformed JSON and
/// [`KinAppError::InvalidPayload`] when the top level is not a JSON object.
#[inline]
pub fn parse_product(raw: &str) -> Result<Product> {
    parse_object(raw)
}

/// Decodes a raw purchase-data blob.
///
/// # Errors
///
/// Returns [`KinAppError::Parse`] for malformed JSON and
/// [`KinAppError::InvalidPayload`] when the top level is not a JSON object.
#[inline]
pub fn parse_purchase(raw: &str) -> Result<Purchase> {
    parse_object(raw)
}

/// Decodes `raw` as a JSON object into `T`.
///
/// Arrays are rejected up front: serde would otherwise accept a sequence for
/// a struct whose fields all have defaults.
fn parse_object<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        tracing::debug!(len = raw.len(), "payload is not a JSON object");
        return Err(KinAppError::InvalidPayload("expected a JSON object"));
    }
    Ok(serde_json::from_value(value)?)
}
