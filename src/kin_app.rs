//! High-level billing facade.
//!
//! Combines a [`BillingService`] / [`BlockingBillingService`] with the
//! connection state machine, the purchase verifier and the restoration
//! loop. Every service call requires the connection to be
//! [`ConnectionState::Ready`](crate::connection::ConnectionState::Ready).

use crate::error::{KinAppError, Result};
use crate::models::{Catalog, PurchaseLaunch, ResponseCode};
use crate::parser;
use crate::verifier::PurchaseVerifier;

/// Billing API version requested unless configured otherwise.
pub const DEFAULT_API_VERSION: u32 = 3;

/// Decodes a SKU details response into a catalog.
fn catalog_from_details(response_code: ResponseCode, details: &[String]) -> Result<Catalog> {
    if !response_code.is_ok() {
        tracing::warn!(code = %response_code, "product details request failed");
        return Err(KinAppError::Api {
            code: response_code,
        });
    }
    let products = details
        .iter()
        .map(|raw| parser::parse_product(raw))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(count = products.len(), "fetched products");
    Ok(Catalog::new(products))
}

/// Turns a buy-intent response into what the caller must do next.
fn launch_from_intent(
    response_code: ResponseCode,
    buy_intent: Option<crate::models::BuyIntent>,
) -> Result<PurchaseLaunch> {
    if let Some(finished) = PurchaseVerifier::buy_intent_outcome(response_code) {
        tracing::debug!("product already owned");
        return Ok(PurchaseLaunch::Finished(finished));
    }
    if !response_code.is_ok() {
        tracing::warn!(code = %response_code, "buy intent request failed");
        return Err(KinAppError::Api {
            code: response_code,
        });
    }
    buy_intent
        .map(PurchaseLaunch::Launch)
        .ok_or(KinAppError::InvalidPayload(
            "successful buy intent response without an intent",
        ))
}

/// Generates a billing facade (async or blocking) and its builder.
macro_rules! define_kin_app {
    (
        facade_name: $facade:ident,
        builder_name: $builder:ident,
        service_trait: $service_trait:ident,
        facade_doc: $facade_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder<S: $service_trait> {
            /// Billing service.
            service: Option<S>,
            /// Package name sent with every call.
            package_name: Option<String>,
            /// Base64 public key used to verify signatures.
            public_key: Option<String>,
            /// Opaque value attached to new purchases.
            developer_payload: Option<String>,
            /// Billing API version.
            api_version: u32,
            /// Page limit for restorations.
            max_pages: Option<usize>,
            /// Request tag of the purchase flow.
            request_code: Option<i32>,
        }

        impl<S: $service_trait> $builder<S> {
            /// Sets the billing service.
            #[inline]
            #[must_use]
            pub fn service(mut self, service: S) -> Self {
                self.service = Some(service);
                self
            }

            /// Sets the application package name.
            #[inline]
            #[must_use]
            pub fn package_name<T: Into<String>>(mut self, package_name: T) -> Self {
                self.package_name = Some(package_name.into());
                self
            }

            /// Sets the base64 public key used to verify purchase signatures.
            #[inline]
            #[must_use]
            pub fn public_key<T: Into<String>>(mut self, public_key: T) -> Self {
                self.public_key = Some(public_key.into());
                self
            }

            /// Sets the developer payload attached to new purchases.
            #[inline]
            #[must_use]
            pub fn developer_payload<T: Into<String>>(mut self, payload: T) -> Self {
                self.developer_payload = Some(payload.into());
                self
            }

            /// Overrides the billing API version (default 3).
            #[inline]
            #[must_use]
            pub const fn api_version(mut self, api_version: u32) -> Self {
                self.api_version = api_version;
                self
            }

            /// Limits the number of pages a restoration may request.
            #[inline]
            #[must_use]
            pub const fn max_pages(mut self, max_pages: usize) -> Self {
                self.max_pages = Some(max_pages);
                self
            }

            /// Overrides the request tag of the purchase flow.
            #[inline]
            #[must_use]
            pub const fn request_code(mut self, request_code: i32) -> Self {
                self.request_code = Some(request_code);
                self
            }

            /// Builds the facade.
            ///
            /// A missing or undecodable public key is not an error: the
            /// facade is built, and only test purchases will verify.
            ///
            /// # Errors
            ///
            /// Returns [`KinAppError::Config`] if no service or no package
            /// name was provided.
            #[inline]
            pub fn build(self) -> Result<$facade<S>> {
                let service = self.service.ok_or_else(|| {
                    KinAppError::Config("billing service is required".to_owned())
                })?;
                let package_name = self
                    .package_name
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| KinAppError::Config("package name is required".to_owned()))?;
                let mut verifier = PurchaseVerifier::new(self.public_key.as_deref().unwrap_or_default());
                if let Some(request_code) = self.request_code {
                    verifier = verifier.request_code(request_code);
                }
                Ok($facade {
                    service,
                    package_name,
                    developer_payload: self.developer_payload.unwrap_or_default(),
                    api_version: self.api_version,
                    max_pages: self.max_pages,
                    verifier,
                    connection: Connection::new(),
                })
            }
        }

        #[doc = $facade_doc]
        #[derive(Debug)]
        pub struct $facade<S: $service_trait> {
            /// Billing service.
            service: S,
            /// Package name sent with every call.
            package_name: String,
            /// Opaque value attached to new purchases.
            developer_payload: String,
            /// Billing API version.
            api_version: u32,
            /// Page limit for restorations.
            max_pages: Option<usize>,
            /// Purchase verifier.
            verifier: PurchaseVerifier,
            /// Connection state machine.
            connection: Connection,
        }

        impl<S: $service_trait> $facade<S> {
            /// Creates a new builder for configuring the facade.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder<S> {
                $builder {
                    service: None,
                    package_name: None,
                    public_key: None,
                    developer_payload: None,
                    api_version: DEFAULT_API_VERSION,
                    max_pages: None,
                    request_code: None,
                }
            }

            /// Returns the underlying billing service.
            #[inline]
            #[must_use]
            pub const fn service(&self) -> &S {
                &self.service
            }

            /// Returns the configured package name.
            #[inline]
            #[must_use]
            pub fn package_name(&self) -> &str {
                &self.package_name
            }

            // ── Connection lifecycle ────────────────────────────────────

            /// Records that a bind to the service was requested.
            ///
            /// # Errors
            ///
            /// Returns an error if the connection state lock is poisoned.
            #[inline]
            pub fn bind(&self) -> Result<ConnectionState> {
                self.connection.apply(ConnectionEvent::Bind)
            }

            /// Records that the platform delivered the service. Listeners
            /// see [`ConnectionState::Ready`] when billing becomes usable.
            ///
            /// # Errors
            ///
            /// Returns an error if the connection state lock is poisoned.
            #[inline]
            pub fn service_connected(&self) -> Result<ConnectionState> {
                self.connection.apply(ConnectionEvent::ServiceConnected)
            }

            /// Records that the platform lost the service.
            ///
            /// # Errors
            ///
            /// Returns an error if the connection state lock is poisoned.
            #[inline]
            pub fn service_disconnected(&self) -> Result<ConnectionState> {
                self.connection.apply(ConnectionEvent::ServiceDisconnected)
            }

            /// Records that the binding was released.
            ///
            /// # Errors
            ///
            /// Returns an error if the connection state lock is poisoned.
            #[inline]
            pub fn unbind(&self) -> Result<ConnectionState> {
                self.connection.apply(ConnectionEvent::Unbind)
            }

            /// Returns the current connection state.
            ///
            /// # Errors
            ///
            /// Returns an error if the connection state lock is poisoned.
            #[inline]
            pub fn connection_state(&self) -> Result<ConnectionState> {
                self.connection.state()
            }

            /// Registers a listener notified on every connection state change.
            ///
            /// # Errors
            ///
            /// Returns an error if the listener lock is poisoned.
            #[inline]
            pub fn on_connection_change<F>(&self, listener: F) -> Result<()>
            where
                F: Fn(ConnectionState) + Send + Sync + 'static,
            {
                self.connection.on_change(listener)
            }

            // ── Service calls ───────────────────────────────────────────

            /// Returns `true` if the service supports billing of
            /// `product_type`.
            ///
            /// # Errors
            ///
            /// Returns [`KinAppError::NotConnected`] unless ready, or the
            /// service's transport error.
            #[tracing::instrument(skip_all, fields(product_type = %product_type))]
            pub $($async_kw)? fn is_billing_supported(&self, product_type: ProductType) -> Result<bool> {
                self.connection.ensure_ready()?;
                let code = self
                    .service
                    .is_billing_supported(self.api_version, &self.package_name, product_type)
                    $( .$await_ext )? ?;
                tracing::debug!(%code, "billing support checked");
                Ok(code.is_ok())
            }

            /// Fetches catalog details of `product_ids`.
            ///
            /// # Errors
            ///
            /// Returns [`KinAppError::NotConnected`] unless ready,
            /// [`KinAppError::Api`] for a non-OK response, a parse error for
            /// an undecodable product, or the service's transport error.
            #[tracing::instrument(skip_all, fields(product_type = %product_type, requested = product_ids.len()))]
            pub $($async_kw)? fn fetch_products(
                &self,
                product_ids: &[ProductId],
                product_type: ProductType,
            ) -> Result<Catalog> {
                self.connection.ensure_ready()?;
                let response = self
                    .service
                    .sku_details(self.api_version, &self.package_name, product_type, product_ids)
                    $( .$await_ext )? ?;
                catalog_from_details(response.response_code, &response.item_details_list)
            }

            /// Starts a purchase of `product_id`.
            ///
            /// Returns [`PurchaseLaunch::Launch`] with the intent to start,
            /// or [`PurchaseLaunch::Finished`] with
            /// [`VerificationOutcome::AlreadyOwned`](crate::models::VerificationOutcome::AlreadyOwned)
            /// when the user already owns the product.
            ///
            /// # Errors
            ///
            /// Returns [`KinAppError::NotConnected`] unless ready,
            /// [`KinAppError::Api`] for any other non-OK response, or the
            /// service's transport error.
            #[tracing::instrument(skip_all, fields(product_id = %product_id))]
            pub $($async_kw)? fn purchase(
                &self,
                product_id: &ProductId,
                product_type: ProductType,
            ) -> Result<PurchaseLaunch> {
                self.connection.ensure_ready()?;
                let response = self
                    .service
                    .buy_intent(
                        self.api_version,
                        &self.package_name,
                        product_id,
                        product_type,
                        &self.developer_payload,
                    )
                    $( .$await_ext )? ?;
                launch_from_intent(response.response_code, response.buy_intent)
            }

            /// Classifies a purchase-flow completion event.
            ///
            /// Pure: needs no connection and never fails.
            #[inline]
            #[must_use]
            pub fn verify_purchase(&self, event: &PurchaseFlowEvent) -> Verification {
                self.verifier.verify(event)
            }

            /// Restores every owned purchase of `product_type`, following
            /// continuation tokens with the configured page limit.
            ///
            /// # Errors
            ///
            /// See [`Self::restore_purchases_with`].
            #[inline]
            pub $($async_kw)? fn restore_purchases(&self, product_type: ProductType) -> Result<Vec<Purchase>> {
                self.restore_purchases_with(product_type, self.restore_options())
                    $( .$await_ext )?
            }

            /// Restores every owned purchase of `product_type` under
            /// explicit guards.
            ///
            /// # Errors
            ///
            /// Returns [`KinAppError::NotConnected`] unless ready,
            /// [`KinAppError::Api`] for a non-OK page,
            /// [`KinAppError::PageLimitExceeded`] or
            /// [`KinAppError::Cancelled`] when a guard trips, a parse error
            /// for an undecodable blob, or the service's transport error.
            #[tracing::instrument(skip_all, fields(product_type = %product_type))]
            pub $($async_kw)? fn restore_purchases_with(
                &self,
                product_type: ProductType,
                options: RestoreOptions,
            ) -> Result<Vec<Purchase>> {
                let restoration = self.collect_pages(product_type, options) $( .$await_ext )? ?;
                Ok(restoration.into_purchases())
            }

            /// Restores owned purchases of `product_type`, keeping only those
            /// whose signature verifies (or that are test purchases).
            ///
            /// # Errors
            ///
            /// See [`Self::restore_purchases_with`].
            #[inline]
            pub $($async_kw)? fn restore_verified_purchases(
                &self,
                product_type: ProductType,
            ) -> Result<Vec<Purchase>> {
                self.restore_verified_purchases_with(product_type, self.restore_options())
                    $( .$await_ext )?
            }

            /// Restores owned purchases of `product_type` under explicit
            /// guards, keeping only those that pass authenticity checks.
            ///
            /// # Errors
            ///
            /// See [`Self::restore_purchases_with`].
            #[tracing::instrument(skip_all, fields(product_type = %product_type))]
            pub $($async_kw)? fn restore_verified_purchases_with(
                &self,
                product_type: ProductType,
                options: RestoreOptions,
            ) -> Result<Vec<Purchase>> {
                let restoration = self.collect_pages(product_type, options) $( .$await_ext )? ?;
                Ok(restoration.into_verified(&self.verifier))
            }

            /// Consumes `purchase` so it can be bought again.
            ///
            /// # Errors
            ///
            /// Returns [`KinAppError::NotConnected`] unless ready,
            /// [`KinAppError::Api`] for a non-OK response (for instance
            /// [`ResponseCode::ItemNotOwned`](crate::models::ResponseCode::ItemNotOwned)
            /// when already consumed), or the
            /// service's transport error.
            #[tracing::instrument(skip_all, fields(product_id = %purchase.product_id))]
            pub $($async_kw)? fn consume_purchase(&self, purchase: &Purchase) -> Result<()> {
                self.connection.ensure_ready()?;
                let code = self
                    .service
                    .consume_purchase(self.api_version, &self.package_name, &purchase.purchase_token)
                    $( .$await_ext )? ?;
                if code.is_ok() {
                    tracing::debug!("purchase consumed");
                    Ok(())
                } else {
                    tracing::warn!(%code, "consume request failed");
                    Err(KinAppError::Api { code })
                }
            }

            // ── Internals ───────────────────────────────────────────────

            /// Guards applied by [`Self::restore_purchases`].
            fn restore_options(&self) -> RestoreOptions {
                match self.max_pages {
                    Some(max_pages) => RestoreOptions::new().max_pages(max_pages),
                    None => RestoreOptions::new(),
                }
            }

            /// Requests pages until the listing ends or a guard trips.
            $($async_kw)? fn collect_pages(
                &self,
                product_type: ProductType,
                options: RestoreOptions,
            ) -> Result<Restoration> {
                let mut restoration = Restoration::new(options);
                let mut token: Option<String> = None;
                loop {
                    self.connection.ensure_ready()?;
                    restoration.check_continue()?;
                    let page = self
                        .service
                        .purchases(
                            self.api_version,
                            &self.package_name,
                            product_type,
                            token.as_deref(),
                        )
                        $( .$await_ext )? ?;
                    token = restoration.absorb(page)?;
                    if token.is_none() {
                        break;
                    }
                }
                tracing::debug!(pages = restoration.pages(), "restoration complete");
                Ok(restoration)
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_kin_app {
    //! Async billing facade.

    use crate::billing::BillingService;
    use crate::connection::{Connection, ConnectionEvent, ConnectionState};
    use crate::error::{KinAppError, Result};
    use crate::models::{
        Catalog, ProductId, ProductType, Purchase, PurchaseFlowEvent, PurchaseLaunch,
        Verification,
    };
    use crate::restore::{Restoration, RestoreOptions};
    use crate::verifier::PurchaseVerifier;

    use super::{DEFAULT_API_VERSION, catalog_from_details, launch_from_intent};

    define_kin_app! {
        facade_name: KinApp,
        builder_name: KinAppBuilder,
        service_trait: BillingService,
        facade_doc: "Async billing facade.\n\nUse [`KinApp::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`KinApp`] facade.",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_kin_app {
    //! Blocking billing facade.

    use crate::billing::BlockingBillingService;
    use crate::connection::{Connection, ConnectionEvent, ConnectionState};
    use crate::error::{KinAppError, Result};
    use crate::models::{
        Catalog, ProductId, ProductType, Purchase, PurchaseFlowEvent, PurchaseLaunch,
        Verification,
    };
    use crate::restore::{Restoration, RestoreOptions};
    use crate::verifier::PurchaseVerifier;

    use super::{DEFAULT_API_VERSION, catalog_from_details, launch_from_intent};

    define_kin_app! {
        facade_name: KinAppBlocking,
        builder_name: KinAppBlockingBuilder,
        service_trait: BlockingBillingService,
        facade_doc: "Blocking billing facade.\n\nUse [`KinAppBlocking::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`KinAppBlocking`] facade.",
    }
}

#[cfg(feature = "async")]
pub use async_kin_app::{KinApp, KinAppBuilder};
#[cfg(feature = "blocking")]
pub use blocking_kin_app::{KinAppBlocking, KinAppBlockingBuilder};

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::billing::InMemoryBillingService;
    use crate::connection::ConnectionState;
    use crate::models::{
        Product, ProductId, ProductType, PurchaseFlowData, PurchaseFlowEvent, PurchasesPage,
        PurchaseToken, TEST_PURCHASE_SUCCESS, VerificationOutcome,
    };
    use crate::restore::{CancelFlag, RestoreOptions};
    use crate::test_keys::keys;
    use crate::verifier::{PURCHASE_REQUEST_CODE, RESULT_OK};

    const PACKAGE: &str = "com.example.app";

    // ── Test helpers ───────────────────────────────────────────────────

    fn blob(id: &str) -> String {
        format!(
            r#"{{"orderId":"GPA.{id}","packageName":"{PACKAGE}","productId":"{id}","purchaseTime":1700000000000,"purchaseState":0,"purchaseToken":"tok-{id}"}}"#
        )
    }

    fn product(id: &str) -> Product {
        Product {
            product_id: ProductId::from(id),
            title: format!("Title {id}"),
            product_type: ProductType::Inapp,
            ..Product::default()
        }
    }

    /// Six signed purchases served two per page.
    fn six_owned() -> InMemoryBillingService {
        let service = InMemoryBillingService::new().with_page_size(2);
        for index in 0..6 {
            let data = blob(&format!("item-{index}"));
            let signature = keys().sign(&data);
            service
                .add_purchase(ProductType::Inapp, data, signature)
                .unwrap();
        }
        service
    }

    fn ids(purchases: &[crate::models::Purchase]) -> Vec<String> {
        purchases
            .iter()
            .map(|purchase| purchase.product_id.as_inner().to_owned())
            .collect()
    }

    /// Service whose listing never ends, optionally cancelling a flag
    /// after a number of pages.
    #[derive(Debug, Default)]
    struct EndlessService {
        /// `purchases` calls answered.
        calls: AtomicUsize,
        /// Flag set once `calls` reaches the given count.
        cancel_at: Option<(usize, CancelFlag)>,
    }

    impl EndlessService {
        fn next_page(&self) -> PurchasesPage {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((at, flag)) = &self.cancel_at {
                if call >= *at {
                    flag.cancel();
                }
            }
            PurchasesPage::ok(vec![blob("loop")], vec![String::new()], Some("again".to_owned()))
        }
    }

    #[cfg(feature = "blocking")]
    impl crate::billing::BlockingBillingService for EndlessService {
        fn is_billing_supported(&self, _: u32, _: &str, _: ProductType) -> Result<ResponseCode> {
            Ok(ResponseCode::Ok)
        }

        fn sku_details(
            &self,
            _: u32,
            _: &str,
            _: ProductType,
            _: &[ProductId],
        ) -> Result<crate::models::SkuDetailsResponse> {
            Err(KinAppError::RemoteBinding("not scripted".into()))
        }

        fn buy_intent(
            &self,
            _: u32,
            _: &str,
            _: &ProductId,
            _: ProductType,
            _: &str,
        ) -> Result<crate::models::BuyIntentResponse> {
            Err(KinAppError::RemoteBinding("not scripted".into()))
        }

        fn purchases(
            &self,
            _: u32,
            _: &str,
            _: ProductType,
            _: Option<&str>,
        ) -> Result<PurchasesPage> {
            Ok(self.next_page())
        }

        fn consume_purchase(&self, _: u32, _: &str, _: &PurchaseToken) -> Result<ResponseCode> {
            Ok(ResponseCode::ItemNotOwned)
        }
    }

    #[cfg(feature = "async")]
    impl crate::billing::BillingService for EndlessService {
        fn is_billing_supported(
            &self,
            _: u32,
            _: &str,
            _: ProductType,
        ) -> impl Future<Output = Result<ResponseCode>> + Send {
            core::future::ready(Ok(ResponseCode::Ok))
        }

        fn sku_details(
            &self,
            _: u32,
            _: &str,
            _: ProductType,
            _: &[ProductId],
        ) -> impl Future<Output = Result<crate::models::SkuDetailsResponse>> + Send {
            core::future::ready(Err(KinAppError::RemoteBinding("not scripted".into())))
        }

        fn buy_intent(
            &self,
            _: u32,
            _: &str,
            _: &ProductId,
            _: ProductType,
            _: &str,
        ) -> impl Future<Output = Result<crate::models::BuyIntentResponse>> + Send {
            core::future::ready(Err(KinAppError::RemoteBinding("not scripted".into())))
        }

        fn purchases(
            &self,
            _: u32,
            _: &str,
            _: ProductType,
            _: Option<&str>,
        ) -> impl Future<Output = Result<PurchasesPage>> + Send {
            core::future::ready(Ok(self.next_page()))
        }

        fn consume_purchase(
            &self,
            _: u32,
            _: &str,
            _: &PurchaseToken,
        ) -> impl Future<Output = Result<ResponseCode>> + Send {
            core::future::ready(Ok(ResponseCode::ItemNotOwned))
        }
    }

    #[test]
    fn catalog_from_failed_details_is_api_error() {
        let err = catalog_from_details(ResponseCode::ServiceUnavailable, &[]).unwrap_err();
        assert!(matches!(
            err,
            KinAppError::Api {
                code: ResponseCode::ServiceUnavailable
            }
        ));
    }

    #[test]
    fn launch_from_owned_intent_is_finished() {
        let launch = launch_from_intent(ResponseCode::ItemAlreadyOwned, None).unwrap();
        assert!(matches!(
            launch,
            PurchaseLaunch::Finished(ref verification)
                if verification.outcome() == VerificationOutcome::AlreadyOwned
        ));
    }

    #[test]
    fn launch_without_intent_is_invalid_payload() {
        let err = launch_from_intent(ResponseCode::Ok, None).unwrap_err();
        assert!(matches!(err, KinAppError::InvalidPayload(_)));
    }

    // ── Blocking facade ────────────────────────────────────────────────

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::kin_app::KinAppBlocking;

        fn ready<S: crate::billing::BlockingBillingService>(service: S) -> KinAppBlocking<S> {
            let app = KinAppBlocking::builder()
                .service(service)
                .package_name(PACKAGE)
                .public_key(keys().public_key())
                .developer_payload("payload")
                .build()
                .unwrap();
            let _state = app.bind().unwrap();
            let _state = app.service_connected().unwrap();
            app
        }

        #[test]
        fn builder_requires_service_and_package() {
            let err = KinAppBlocking::<InMemoryBillingService>::builder()
                .package_name(PACKAGE)
                .build()
                .unwrap_err();
            assert!(matches!(err, KinAppError::Config(_)));
            let err = KinAppBlocking::builder()
                .service(InMemoryBillingService::new())
                .package_name("  ")
                .build()
                .unwrap_err();
            assert!(matches!(err, KinAppError::Config(_)));
        }

        #[test]
        fn calls_require_ready_connection() {
            let app = KinAppBlocking::builder()
                .service(InMemoryBillingService::new())
                .package_name(PACKAGE)
                .build()
                .unwrap();
            assert_eq!(app.connection_state().unwrap(), ConnectionState::Disconnected);
            assert!(matches!(
                app.is_billing_supported(ProductType::Inapp).unwrap_err(),
                KinAppError::NotConnected { .. }
            ));
            let _state = app.bind().unwrap();
            assert!(matches!(
                app.restore_purchases(ProductType::Inapp).unwrap_err(),
                KinAppError::NotConnected {
                    state: ConnectionState::Connecting
                }
            ));
            let _state = app.service_connected().unwrap();
            assert!(app.is_billing_supported(ProductType::Inapp).unwrap());
            let _state = app.unbind().unwrap();
            assert!(app.is_billing_supported(ProductType::Inapp).is_err());
        }

        #[test]
        fn listener_sees_billing_ready() {
            let app = KinAppBlocking::builder()
                .service(InMemoryBillingService::new())
                .package_name(PACKAGE)
                .build()
                .unwrap();
            let seen = Arc::new(Mutex::new(Vec::new()));
            {
                let seen = Arc::clone(&seen);
                app.on_connection_change(move |state| seen.lock().unwrap().push(state))
                    .unwrap();
            }
            let _state = app.bind().unwrap();
            let _state = app.service_connected().unwrap();
            let _state = app.service_disconnected().unwrap();
            assert_eq!(
                *seen.lock().unwrap(),
                vec![
                    ConnectionState::Connecting,
                    ConnectionState::Ready,
                    ConnectionState::Connecting
                ]
            );
        }

        #[test]
        fn restore_follows_continuation_tokens() {
            let app = ready(six_owned());
            let purchases = app.restore_purchases(ProductType::Inapp).unwrap();
            assert_eq!(
                ids(&purchases),
                vec!["item-0", "item-1", "item-2", "item-3", "item-4", "item-5"]
            );
            assert_eq!(app.service().purchases_calls().unwrap(), 3);
            assert_eq!(purchases[0].package_name, PACKAGE);
        }

        #[test]
        fn restore_empty_listing() {
            let app = ready(InMemoryBillingService::new());
            assert!(app.restore_purchases(ProductType::Subscription).unwrap().is_empty());
            assert_eq!(app.service().purchases_calls().unwrap(), 1);
        }

        #[test]
        fn restore_unsupported_type_is_api_error() {
            let service =
                InMemoryBillingService::new().with_supported_types(vec![ProductType::Inapp]);
            let app = ready(service);
            assert!(matches!(
                app.restore_purchases(ProductType::Subscription).unwrap_err(),
                KinAppError::Api {
                    code: ResponseCode::BillingUnavailable
                }
            ));
        }

        #[test]
        fn restore_endless_listing_hits_page_limit() {
            let app = KinAppBlocking::builder()
                .service(EndlessService::default())
                .package_name(PACKAGE)
                .max_pages(5)
                .build()
                .unwrap();
            let _state = app.bind().unwrap();
            let _state = app.service_connected().unwrap();
            assert!(matches!(
                app.restore_purchases(ProductType::Inapp).unwrap_err(),
                KinAppError::PageLimitExceeded { pages: 5 }
            ));
            assert_eq!(app.service().calls.load(Ordering::SeqCst), 5);
        }

        #[test]
        fn restore_cancelled_between_pages() {
            let flag = CancelFlag::new();
            let service = EndlessService {
                cancel_at: Some((3, flag.clone())),
                ..EndlessService::default()
            };
            let app = ready(service);
            let err = app
                .restore_purchases_with(
                    ProductType::Inapp,
                    RestoreOptions::new().cancel_flag(flag),
                )
                .unwrap_err();
            assert!(matches!(err, KinAppError::Cancelled));
            assert_eq!(app.service().calls.load(Ordering::SeqCst), 3);
        }

        #[test]
        fn restore_verified_drops_forged_records() {
            let service = InMemoryBillingService::new();
            let genuine = blob("genuine");
            service
                .add_purchase(ProductType::Inapp, genuine.clone(), keys().sign(&genuine))
                .unwrap();
            service
                .add_purchase(ProductType::Inapp, blob("forged"), keys().sign("other"))
                .unwrap();
            service
                .add_purchase(ProductType::Inapp, blob(TEST_PURCHASE_SUCCESS), "")
                .unwrap();
            let app = ready(service);
            let all = app.restore_purchases(ProductType::Inapp).unwrap();
            assert_eq!(all.len(), 3);
            let verified = app.restore_verified_purchases(ProductType::Inapp).unwrap();
            assert_eq!(ids(&verified), vec!["genuine", TEST_PURCHASE_SUCCESS]);
        }

        #[test]
        fn restore_verified_honours_explicit_guards() {
            let flag = CancelFlag::new();
            let service = EndlessService {
                cancel_at: Some((2, flag.clone())),
                ..EndlessService::default()
            };
            let app = ready(service);
            let err = app
                .restore_verified_purchases_with(
                    ProductType::Inapp,
                    RestoreOptions::new().cancel_flag(flag),
                )
                .unwrap_err();
            assert!(matches!(err, KinAppError::Cancelled));
            assert_eq!(app.service().calls.load(Ordering::SeqCst), 2);

            let err = app
                .restore_verified_purchases_with(
                    ProductType::Inapp,
                    RestoreOptions::new().max_pages(4),
                )
                .unwrap_err();
            assert!(matches!(err, KinAppError::PageLimitExceeded { pages: 4 }));
        }

        #[test]
        fn disconnected_service_is_remote_binding_error() {
            let app = ready(InMemoryBillingService::new());
            app.service().disconnect().unwrap();
            assert!(matches!(
                app.restore_purchases(ProductType::Inapp).unwrap_err(),
                KinAppError::RemoteBinding(_)
            ));
        }

        #[test]
        fn fetch_products_builds_catalog() {
            let service = InMemoryBillingService::new();
            service.add_product(product("gas")).unwrap();
            service.add_product(product("premium")).unwrap();
            let app = ready(service);
            let catalog = app
                .fetch_products(
                    &[ProductId::from("premium"), ProductId::from("missing")],
                    ProductType::Inapp,
                )
                .unwrap();
            assert_eq!(catalog.len(), 1);
            assert!(catalog.contains(&ProductId::from("premium")));
        }

        #[test]
        fn purchase_launches_or_finishes() {
            let service = six_owned();
            service.add_product(product("item-0")).unwrap();
            service.add_product(product("fresh")).unwrap();
            let app = ready(service);

            let launch = app
                .purchase(&ProductId::from("fresh"), ProductType::Inapp)
                .unwrap();
            assert!(matches!(launch, PurchaseLaunch::Launch(_)));

            let owned = app
                .purchase(&ProductId::from("item-0"), ProductType::Inapp)
                .unwrap();
            assert!(matches!(
                owned,
                PurchaseLaunch::Finished(ref verification)
                    if verification.outcome() == VerificationOutcome::AlreadyOwned
                        && verification.purchase().is_none()
            ));

            assert!(matches!(
                app.purchase(&ProductId::from("nope"), ProductType::Inapp)
                    .unwrap_err(),
                KinAppError::Api {
                    code: ResponseCode::ItemUnavailable
                }
            ));
        }

        #[test]
        fn consume_then_buy_again() {
            let service = six_owned();
            service.add_product(product("item-0")).unwrap();
            let app = ready(service);
            let purchases = app.restore_purchases(ProductType::Inapp).unwrap();
            app.consume_purchase(&purchases[0]).unwrap();
            assert!(matches!(
                app.consume_purchase(&purchases[0]).unwrap_err(),
                KinAppError::Api {
                    code: ResponseCode::ItemNotOwned
                }
            ));
            let launch = app
                .purchase(&ProductId::from("item-0"), ProductType::Inapp)
                .unwrap();
            assert!(matches!(launch, PurchaseLaunch::Launch(_)));
            assert_eq!(app.restore_purchases(ProductType::Inapp).unwrap().len(), 5);
        }

        #[test]
        fn verify_purchase_uses_configured_key() {
            let app = ready(InMemoryBillingService::new());
            let data = blob("premium");
            let event = PurchaseFlowEvent {
                request_code: PURCHASE_REQUEST_CODE,
                result_code: RESULT_OK,
                data: Some(PurchaseFlowData {
                    signature: Some(keys().sign(&data)),
                    purchase_data: Some(data),
                }),
            };
            let verification = app.verify_purchase(&event);
            assert!(verification.is_success());
            assert_eq!(
                verification.purchase().unwrap().package_name,
                PACKAGE.to_owned()
            );
        }

        #[test]
        fn custom_request_code_respected() {
            let app = KinAppBlocking::builder()
                .service(InMemoryBillingService::new())
                .package_name(PACKAGE)
                .request_code(77)
                .build()
                .unwrap();
            let event = PurchaseFlowEvent {
                request_code: PURCHASE_REQUEST_CODE,
                result_code: RESULT_OK,
                data: None,
            };
            assert_eq!(
                app.verify_purchase(&event).outcome(),
                VerificationOutcome::NotApplicable
            );
        }
    }

    // ── Async facade ───────────────────────────────────────────────────

    #[cfg(feature = "async")]
    mod non_blocking {
        use super::*;
        use crate::kin_app::KinApp;

        fn ready<S: crate::billing::BillingService>(service: S) -> KinApp<S> {
            let app = KinApp::builder()
                .service(service)
                .package_name(PACKAGE)
                .public_key(keys().public_key())
                .build()
                .unwrap();
            let _state = app.bind().unwrap();
            let _state = app.service_connected().unwrap();
            app
        }

        #[tokio::test]
        async fn restore_three_pages_of_two() {
            let app = ready(six_owned());
            let purchases = app.restore_purchases(ProductType::Inapp).await.unwrap();
            assert_eq!(purchases.len(), 6);
            assert_eq!(ids(&purchases)[5], "item-5");
            assert_eq!(app.service().purchases_calls().unwrap(), 3);
        }

        #[tokio::test]
        async fn restore_endless_listing_hits_page_limit() {
            let app = ready(EndlessService::default());
            let err = app
                .restore_purchases_with(ProductType::Inapp, RestoreOptions::new().max_pages(3))
                .await
                .unwrap_err();
            assert!(matches!(err, KinAppError::PageLimitExceeded { pages: 3 }));
        }

        #[tokio::test]
        async fn restore_precancelled_makes_no_calls() {
            let app = ready(EndlessService::default());
            let flag = CancelFlag::new();
            flag.cancel();
            let err = app
                .restore_purchases_with(ProductType::Inapp, RestoreOptions::new().cancel_flag(flag))
                .await
                .unwrap_err();
            assert!(matches!(err, KinAppError::Cancelled));
            assert_eq!(app.service().calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn restoration_future_is_send() {
            let app = Arc::new(ready(six_owned()));
            let handle = tokio::spawn({
                let app = Arc::clone(&app);
                async move { app.restore_verified_purchases(ProductType::Inapp).await }
            });
            let verified = handle.await.unwrap().unwrap();
            assert_eq!(verified.len(), 6);
        }

        #[tokio::test]
        async fn purchase_and_consume() {
            let service = six_owned();
            service.add_product(product("item-1")).unwrap();
            let app = ready(service);
            let owned = app
                .purchase(&ProductId::from("item-1"), ProductType::Inapp)
                .await
                .unwrap();
            assert!(matches!(owned, PurchaseLaunch::Finished(_)));
            let purchases = app.restore_purchases(ProductType::Inapp).await.unwrap();
            app.consume_purchase(&purchases[1]).await.unwrap();
            let launch = app
                .purchase(&ProductId::from("item-1"), ProductType::Inapp)
                .await
                .unwrap();
            assert!(matches!(launch, PurchaseLaunch::Launch(_)));
        }

        #[tokio::test]
        async fn fetch_products_requires_ready() {
            let app = KinApp::builder()
                .service(InMemoryBillingService::new())
                .package_name(PACKAGE)
                .build()
                .unwrap();
            let err = app
                .fetch_products(&[ProductId::from("gas")], ProductType::Inapp)
                .await
                .unwrap_err();
            assert!(matches!(err, KinAppError::NotConnected { .. }));
        }
    }
}
