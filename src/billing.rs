//! Capability interface to the platform billing service.
//!
//! This module defines the [`BillingService`] (async) and
//! [`BlockingBillingService`] (blocking) traits via a shared macro. The
//! platform binding implements one of them; [`InMemoryBillingService`]
//! implements both for tests and offline use.

mod memory;

pub use memory::{BillingFixture, DEFAULT_PAGE_SIZE, FixturePurchase, InMemoryBillingService};

/// Generates a billing service trait (async or blocking) with all vendor
/// calls.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_billing_service {
    // ── Entry points ────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_billing_service!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_billing_service!(@methods blocking);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        define_billing_service!(@method $mode, is_billing_supported,
            "Asks whether billing of `product_type` is available for the package.\n\n# Errors\n\nReturns [`KinAppError::RemoteBinding`](crate::error::KinAppError::RemoteBinding) if the service cannot be reached.",
            api_version: u32, package_name: &str, product_type: ProductType, -> Result<ResponseCode>);
        define_billing_service!(@method $mode, sku_details,
            "Fetches the catalog details of `product_ids`.\n\n# Errors\n\nReturns [`KinAppError::RemoteBinding`](crate::error::KinAppError::RemoteBinding) if the service cannot be reached.",
            api_version: u32, package_name: &str, product_type: ProductType, product_ids: &[ProductId], -> Result<SkuDetailsResponse>);
        define_billing_service!(@method $mode, buy_intent,
            "Requests an intent that starts the purchase flow for `product_id`.\n\n# Errors\n\nReturns [`KinAppError::RemoteBinding`](crate::error::KinAppError::RemoteBinding) if the service cannot be reached.",
            api_version: u32, package_name: &str, product_id: &ProductId, product_type: ProductType, developer_payload: &str, -> Result<BuyIntentResponse>);
        define_billing_service!(@method $mode, purchases,
            "Lists one page of owned purchases, starting at `continuation_token` (`None` for the first page).\n\n# Errors\n\nReturns [`KinAppError::RemoteBinding`](crate::error::KinAppError::RemoteBinding) if the service cannot be reached.",
            api_version: u32, package_name: &str, product_type: ProductType, continuation_token: Option<&str>, -> Result<PurchasesPage>);
        define_billing_service!(@method $mode, consume_purchase,
            "Consumes the purchase identified by `purchase_token`.\n\n# Errors\n\nReturns [`KinAppError::RemoteBinding`](crate::error::KinAppError::RemoteBinding) if the service cannot be reached.",
            api_version: u32, package_name: &str, purchase_token: &PurchaseToken, -> Result<ResponseCode>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_billing {
    //! Async billing service trait definition.

    use crate::error::Result;
    use crate::models::{
        BuyIntentResponse, ProductId, ProductType, PurchaseToken, PurchasesPage, ResponseCode,
        SkuDetailsResponse,
    };

    define_billing_service! {
        trait_name: BillingService,
        trait_doc: "Async access to the platform billing service.\n\nAll methods take `&self`; implementations serialize access to a\nsingle-connection binding themselves (e.g. with a `Mutex`).",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_billing {
    //! Blocking billing service trait definition.

    use crate::error::Result;
    use crate::models::{
        BuyIntentResponse, ProductId, ProductType, PurchaseToken, PurchasesPage, ResponseCode,
        SkuDetailsResponse,
    };

    define_billing_service! {
        trait_name: BlockingBillingService,
        trait_doc: "Blocking access to the platform billing service.\n\nAll methods take `&self`; implementations serialize access to a\nsingle-connection binding themselves (e.g. with a `Mutex`).",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_billing::BillingService;
#[cfg(feature = "blocking")]
pub use blocking_billing::BlockingBillingService;
