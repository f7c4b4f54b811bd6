//! Data models for Google Play in-app billing entities.
//!
//! This module contains strongly-typed representations of products,
//! purchases and verification outcomes, newtype ID wrappers, and the wire
//! shapes exchanged with the billing service.

mod catalog;
mod enums;
mod ids;
mod lenient;
mod outcome;
mod product;
mod purchase;
mod responses;

pub use catalog::Catalog;
pub use enums::{ProductType, PurchaseState, ResponseCode};
pub use ids::{
    OrderId, ProductId, PurchaseToken, TEST_PURCHASE_CANCELED, TEST_PURCHASE_PREFIX,
    TEST_PURCHASE_REFUNDED, TEST_PURCHASE_SUCCESS, TEST_PURCHASE_UNAVAILABLE,
};
pub use outcome::{Verification, VerificationOutcome};
pub use product::Product;
pub use purchase::Purchase;
pub use responses::{
    BuyIntent, BuyIntentResponse, PurchaseFlowData, PurchaseFlowEvent, PurchaseLaunch,
    PurchasesPage, SkuDetailsResponse,
};
