//! Newtype wrappers for vendor identifiers.
//!
//! Product ids, order ids and purchase tokens are all plain strings on the
//! wire; wrapping them keeps a token from being passed where a product id
//! is expected.

use serde::{Deserialize, Serialize};

/// Product id prefix reserved by the vendor for unsigned sandbox purchases.
pub const TEST_PURCHASE_PREFIX: &str = "android.test";

/// Static test product that always completes successfully.
pub const TEST_PURCHASE_SUCCESS: &str = "android.test.purchased";

/// Static test product that always reports a cancelled purchase.
pub const TEST_PURCHASE_CANCELED: &str = "android.test.canceled";

/// Static test product that always reports a refunded purchase.
pub const TEST_PURCHASE_REFUNDED: &str = "android.test.refunded";

/// Static test product that is never available.
pub const TEST_PURCHASE_UNAVAILABLE: &str = "android.test.item_unavailable";

/// Macro to define a newtype ID wrapping a `String` inner type.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the given string.
            #[inline]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Returns a reference to the inner string.
            #[inline]
            #[must_use]
            pub fn as_inner(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner string.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Returns `true` if the identifier is the empty string.
            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

define_string_id! {
    /// Catalog identifier of a product (the vendor's SKU).
    ProductId
}

define_string_id! {
    /// Vendor order identifier. Absent for test purchases.
    OrderId
}

define_string_id! {
    /// Opaque purchase token; the idempotency key for consumption.
    PurchaseToken
}

impl ProductId {
    /// Returns `true` if this id carries the reserved sandbox prefix.
    ///
    /// Purchases of such products are never signed by the vendor.
    #[inline]
    #[must_use]
    pub fn is_test_purchase(&self) -> bool {
        self.0.starts_with(TEST_PURCHASE_PREFIX)
    }
}
