//! Wire shapes exchanged with the billing service.

use serde::{Deserialize, Serialize};

use super::{ResponseCode, Verification};

/// Answer to a SKU details request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuDetailsResponse {
    /// Vendor response code.
    pub response_code: ResponseCode,
    /// One raw JSON product blob per known product.
    #[serde(default)]
    pub item_details_list: Vec<String>,
}

/// Answer to a buy-intent request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyIntentResponse {
    /// Vendor response code.
    pub response_code: ResponseCode,
    /// Opaque intent to launch the purchase flow, present on success.
    #[serde(default)]
    pub buy_intent: Option<BuyIntent>,
}

/// Opaque handle the caller launches to start the interactive purchase flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuyIntent(String);

impl BuyIntent {
    /// Wraps a platform intent handle.
    #[inline]
    #[must_use]
    pub const fn new(handle: String) -> Self {
        Self(handle)
    }

    /// Returns the platform intent handle.
    #[inline]
    #[must_use]
    pub fn as_inner(&self) -> &str {
        &self.0
    }
}

/// One page of owned purchases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasesPage {
    /// Vendor response code.
    pub response_code: ResponseCode,
    /// Raw JSON purchase blobs in vendor order.
    #[serde(default)]
    pub purchase_data_list: Vec<String>,
    /// Signatures, index-aligned with `purchase_data_list`.
    #[serde(default)]
    pub signature_list: Vec<String>,
    /// Cursor for the next page; `None` on the last page.
    #[serde(default)]
    pub continuation_token: Option<String>,
}

impl PurchasesPage {
    /// Builds a successful page.
    #[inline]
    #[must_use]
    pub const fn ok(
        purchase_data_list: Vec<String>,
        signature_list: Vec<String>,
        continuation_token: Option<String>,
    ) -> Self {
        Self {
            response_code: ResponseCode::Ok,
            purchase_data_list,
            signature_list,
            continuation_token,
        }
    }

    /// Builds an empty page carrying only an error code.
    #[inline]
    #[must_use]
    pub const fn failed(response_code: ResponseCode) -> Self {
        Self {
            response_code,
            purchase_data_list: Vec::new(),
            signature_list: Vec::new(),
            continuation_token: None,
        }
    }
}

/// Payload bundle attached to a purchase-flow completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseFlowData {
    /// Raw JSON purchase blob.
    #[serde(rename = "INAPP_PURCHASE_DATA", default)]
    pub purchase_data: Option<String>,
    /// Base64 signature of `purchase_data`.
    #[serde(rename = "INAPP_DATA_SIGNATURE", default)]
    pub signature: Option<String>,
}

/// Completion of an interactive purchase flow, as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseFlowEvent {
    /// Tag of the request that started the flow.
    pub request_code: i32,
    /// Platform result code of the flow.
    pub result_code: i32,
    /// Attached bundle, if any.
    #[serde(default)]
    pub data: Option<PurchaseFlowData>,
}

impl PurchaseFlowEvent {
    /// Returns the raw purchase data, if present.
    #[inline]
    #[must_use]
    pub fn purchase_data(&self) -> Option<&str> {
        self.data.as_ref()?.purchase_data.as_deref()
    }

    /// Returns the signature, if present.
    #[inline]
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.data.as_ref()?.signature.as_deref()
    }
}

/// What the caller must do after requesting a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseLaunch {
    /// Launch this intent; the result arrives later as a
    /// [`PurchaseFlowEvent`].
    Launch(BuyIntent),
    /// The flow finished before it started (the product is already owned).
    Finished(Verification),
}
