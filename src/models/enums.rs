//! Enumeration types for constrained vendor values.

use serde::{Deserialize, Serialize};

/// Vendor tag for one-time products.
const INAPP_TAG: &str = "inapp";

/// Vendor tag for subscriptions.
const SUBS_TAG: &str = "subs";

/// Kind of product offered in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductType {
    /// One-time (managed) in-app product.
    #[default]
    Inapp,
    /// Recurring subscription.
    Subscription,
}

impl ProductType {
    /// Returns the vendor tag (`"inapp"` or `"subs"`).
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inapp => INAPP_TAG,
            Self::Subscription => SUBS_TAG,
        }
    }

    /// Maps a vendor tag to a product type.
    ///
    /// `"subs"` (any case) is a subscription; every other tag is treated as
    /// a one-time product.
    #[inline]
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case(SUBS_TAG) {
            Self::Subscription
        } else {
            Self::Inapp
        }
    }
}

impl From<String> for ProductType {
    #[inline]
    fn from(value: String) -> Self {
        Self::from_tag(&value)
    }
}

impl From<ProductType> for String {
    #[inline]
    fn from(value: ProductType) -> Self {
        value.as_str().to_owned()
    }
}

impl core::fmt::Display for ProductType {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductType {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(INAPP_TAG) {
            Ok(Self::Inapp)
        } else if s.eq_ignore_ascii_case(SUBS_TAG) {
            Ok(Self::Subscription)
        } else {
            Err(format!("unknown product type: {s} (expected inapp or subs)"))
        }
    }
}

/// State of a purchase as reported by the vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum PurchaseState {
    /// Purchase completed.
    Purchased,
    /// Purchase cancelled. Also the fallback for missing or unknown codes.
    #[default]
    Canceled,
    /// Purchase refunded.
    Refunded,
}

/// Integer tags used on the wire for [`PurchaseState`].
const PURCHASE_STATE_TABLE: [(i64, PurchaseState); 3] = [
    (0, PurchaseState::Purchased),
    (1, PurchaseState::Canceled),
    (2, PurchaseState::Refunded),
];

impl PurchaseState {
    /// Maps a wire code to a state. Unknown codes map to [`Self::Canceled`].
    #[inline]
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        PURCHASE_STATE_TABLE
            .iter()
            .find(|&&(tag, _)| tag == code)
            .map_or(Self::Canceled, |&(_, state)| state)
    }

    /// Returns the wire code of this state.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Purchased => 0,
            Self::Canceled => 1,
            Self::Refunded => 2,
        }
    }
}

impl From<i64> for PurchaseState {
    #[inline]
    fn from(value: i64) -> Self {
        Self::from_code(value)
    }
}

impl From<PurchaseState> for i64 {
    #[inline]
    fn from(value: PurchaseState) -> Self {
        value.code()
    }
}

/// Response code returned by every billing service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ResponseCode {
    /// Success.
    Ok,
    /// User pressed back or cancelled a dialog.
    UserCanceled,
    /// Network connection is down.
    ServiceUnavailable,
    /// Billing API version is not supported for the requested type.
    BillingUnavailable,
    /// Requested product is not available for purchase.
    ItemUnavailable,
    /// Invalid arguments provided to the API.
    DeveloperError,
    /// Fatal error during the API action.
    Error,
    /// Purchase failed because the item is already owned.
    ItemAlreadyOwned,
    /// Consumption failed because the item is not owned.
    ItemNotOwned,
    /// Any code this library does not know.
    Other(i32),
}

impl ResponseCode {
    /// Returns `true` for [`Self::Ok`].
    #[inline]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns the integer code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserCanceled => 1,
            Self::ServiceUnavailable => 2,
            Self::BillingUnavailable => 3,
            Self::ItemUnavailable => 4,
            Self::DeveloperError => 5,
            Self::Error => 6,
            Self::ItemAlreadyOwned => 7,
            Self::ItemNotOwned => 8,
            Self::Other(code) => code,
        }
    }

    /// Returns the vendor's symbolic name for this code.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::UserCanceled => "USER_CANCELED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::BillingUnavailable => "BILLING_UNAVAILABLE",
            Self::ItemUnavailable => "ITEM_UNAVAILABLE",
            Self::DeveloperError => "DEVELOPER_ERROR",
            Self::Error => "ERROR",
            Self::ItemAlreadyOwned => "ITEM_ALREADY_OWNED",
            Self::ItemNotOwned => "ITEM_NOT_OWNED",
            Self::Other(_) => "UNKNOWN",
        }
    }
}

impl From<i32> for ResponseCode {
    #[inline]
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::UserCanceled,
            2 => Self::ServiceUnavailable,
            3 => Self::BillingUnavailable,
            4 => Self::ItemUnavailable,
            5 => Self::DeveloperError,
            6 => Self::Error,
            7 => Self::ItemAlreadyOwned,
            8 => Self::ItemNotOwned,
            other => Self::Other(other),
        }
    }
}

impl From<ResponseCode> for i32 {
    #[inline]
    fn from(value: ResponseCode) -> Self {
        value.code()
    }
}

impl core::fmt::Display for ResponseCode {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
