//! Product (catalog entry) model.

use serde::{Deserialize, Serialize};

use super::{ProductId, ProductType, lenient};

/// A catalog entry offered for purchase, decoded from a SKU details blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    /// Catalog identifier (SKU).
    #[serde(rename = "productId", deserialize_with = "lenient::text")]
    pub product_id: ProductId,
    /// Display title.
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    /// Display description.
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    /// Formatted price including the currency sign.
    #[serde(deserialize_with = "lenient::text")]
    pub price: String,
    /// Price in micro-units of the currency (1 000 000 = one unit).
    #[serde(deserialize_with = "lenient::long")]
    pub price_amount_micros: i64,
    /// ISO 4217 currency code.
    #[serde(deserialize_with = "lenient::text")]
    pub price_currency_code: String,
    /// One-time product or subscription.
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub product_type: ProductType,
}

impl Product {
    /// Decodes a product from the vendor's JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::KinAppError::Parse`] for malformed JSON and
    /// [`crate::error::KinAppError::InvalidPayload`] when the top level is
    /// not an object.
    #[inline]
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        crate::parser::parse_product(raw)
    }

    /// Serializes the product back to the vendor's JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::KinAppError::Parse`] if serialization fails.
    #[inline]
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
