//! Purchase record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, ProductId, PurchaseState, PurchaseToken, lenient};

/// A completed or historical transaction, decoded from a purchase-data blob.
///
/// Purchases are immutable. From the holder's point of view a purchase is
/// gone once its token has been consumed through the billing service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Purchase {
    /// Vendor order id. Absent for test purchases.
    #[serde(
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub order_id: Option<OrderId>,
    /// Purchased product.
    #[serde(deserialize_with = "lenient::text")]
    pub product_id: ProductId,
    /// Purchase time in milliseconds since the Unix epoch.
    #[serde(deserialize_with = "lenient::long")]
    pub purchase_time: i64,
    /// Opaque token used for consumption.
    #[serde(deserialize_with = "lenient::text")]
    pub purchase_token: PurchaseToken,
    /// Purchase state.
    #[serde(deserialize_with = "lenient::long")]
    pub purchase_state: PurchaseState,
    /// Package name of the application that made the purchase.
    #[serde(deserialize_with = "lenient::text")]
    pub package_name: String,
    /// Developer payload echoed back by the vendor.
    #[serde(deserialize_with = "lenient::text")]
    pub developer_payload: String,
    /// Whether a subscription renews automatically.
    #[serde(deserialize_with = "lenient::boolean")]
    pub auto_renewing: bool,
}

impl Purchase {
    /// Decodes a purchase from the vendor's JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::KinAppError::Parse`] for malformed JSON and
    /// [`crate::error::KinAppError::InvalidPayload`] when the top level is
    /// not an object.
    #[inline]
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        crate::parser::parse_purchase(raw)
    }

    /// Serializes the purchase back to the vendor's JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::KinAppError::Parse`] if serialization fails.
    #[inline]
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the purchase time, or `None` if it is out of range.
    #[inline]
    #[must_use]
    pub fn purchased_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.purchase_time)
    }

    /// Returns `true` if the product carries the reserved sandbox prefix.
    #[inline]
    #[must_use]
    pub fn is_test_purchase(&self) -> bool {
        self.product_id.is_test_purchase()
    }
}
