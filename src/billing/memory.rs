//! In-memory billing service for testing and offline use.
//!
//! Provides [`InMemoryBillingService`], a thread-safe fake of the vendor
//! billing service that implements both service traits, and
//! [`BillingFixture`], a JSON description it can be loaded from.

use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use serde::{Deserialize, Serialize};

use crate::error::{KinAppError, Result};
use crate::models::{
    BuyIntent, BuyIntentResponse, Product, ProductId, ProductType, PurchaseToken, PurchasesPage,
    ResponseCode, SkuDetailsResponse, TEST_PURCHASE_UNAVAILABLE,
};
use crate::parser;

/// Lowest API version the service answers.
const MIN_API_VERSION: u32 = 3;

/// Purchases returned per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Prefix of the continuation tokens handed out by the fake.
const TOKEN_PREFIX: &str = "page:";

/// JSON description of a fake billing service.
///
/// ```json
/// {
///   "pageSize": 2,
///   "supportedTypes": ["inapp"],
///   "products": [{"productId": "gas", "type": "inapp", "price": "$0.99"}],
///   "purchases": [{"type": "inapp", "data": "{\"productId\":\"gas\"}", "signature": "..."}]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BillingFixture {
    /// Purchases per page; [`DEFAULT_PAGE_SIZE`] when absent.
    pub page_size: Option<usize>,
    /// Product types with billing support; both when absent.
    pub supported_types: Option<Vec<ProductType>>,
    /// Catalog offered by the service.
    pub products: Vec<Product>,
    /// Purchases already owned by the user.
    pub purchases: Vec<FixturePurchase>,
}

/// One owned purchase in a [`BillingFixture`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturePurchase {
    /// Listing the purchase appears in.
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// Raw JSON purchase blob, exactly as signed.
    pub data: String,
    /// Base64 signature of `data`.
    pub signature: String,
}

impl BillingFixture {
    /// Decodes a fixture from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::Parse`] if the JSON is malformed.
    #[inline]
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Thread-safe fake of the vendor billing service.
///
/// Implements both [`super::BillingService`] (async) and
/// [`super::BlockingBillingService`] (blocking).
///
/// # Behavior
///
/// - Owned purchases are listed `page_size` at a time with opaque
///   continuation tokens.
/// - Each purchase token can be consumed once; consuming it again answers
///   [`ResponseCode::ItemNotOwned`].
/// - Requesting a buy intent for an owned, unconsumed product answers
///   [`ResponseCode::ItemAlreadyOwned`]; for an unknown product
///   [`ResponseCode::ItemUnavailable`]. Reserved `android.test.*` products
///   are always available except the `item_unavailable` one.
/// - After [`disconnect`](Self::disconnect) every call fails with
///   [`KinAppError::RemoteBinding`].
///
/// # Example
///
/// ```rust
/// use kinapp_rs::billing::InMemoryBillingService;
/// use kinapp_rs::models::{Product, ProductId, ProductType};
///
/// let service = InMemoryBillingService::new().with_page_size(2);
/// service
///     .add_product(Product {
///         product_id: ProductId::from("gas"),
///         product_type: ProductType::Inapp,
///         ..Product::default()
///     })
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBillingService {
    /// All state behind a single mutex, serializing calls like the real
    /// single-connection binding.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug)]
struct Inner {
    /// Catalog.
    products: Vec<Product>,
    /// Owned purchases in listing order.
    owned: Vec<OwnedRecord>,
    /// Product types with billing support.
    supported_types: Vec<ProductType>,
    /// Purchases per page.
    page_size: usize,
    /// Whether the binding is alive.
    connected: bool,
    /// Number of `purchases` calls answered.
    purchases_calls: usize,
}

impl Default for Inner {
    #[inline]
    fn default() -> Self {
        Self {
            products: Vec::new(),
            owned: Vec::new(),
            supported_types: vec![ProductType::Inapp, ProductType::Subscription],
            page_size: DEFAULT_PAGE_SIZE,
            connected: true,
            purchases_calls: 0,
        }
    }
}

/// An owned purchase as the service stores it.
#[derive(Debug, Clone)]
struct OwnedRecord {
    /// Listing the purchase appears in.
    product_type: ProductType,
    /// Product the purchase is for.
    product_id: ProductId,
    /// Token used to consume the purchase.
    token: PurchaseToken,
    /// Raw signed blob.
    data: String,
    /// Signature of `data`.
    signature: String,
    /// Whether the purchase has been consumed.
    consumed: bool,
}

impl InMemoryBillingService {
    /// Creates an empty, connected service supporting both product types.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a service from a fixture.
    ///
    /// # Errors
    ///
    /// Returns a parse error if a fixture purchase blob cannot be decoded.
    pub fn from_fixture(fixture: BillingFixture) -> Result<Self> {
        let mut inner = Inner {
            products: fixture.products,
            ..Inner::default()
        };
        if let Some(page_size) = fixture.page_size {
            inner.page_size = page_size.max(1);
        }
        if let Some(types) = fixture.supported_types {
            inner.supported_types = types;
        }
        for purchase in fixture.purchases {
            inner.owned.push(OwnedRecord::decode(
                purchase.product_type,
                purchase.data,
                purchase.signature,
            )?);
        }
        tracing::debug!(
            products = inner.products.len(),
            purchases = inner.owned.len(),
            page_size = inner.page_size,
            "loaded billing fixture"
        );
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Sets the number of purchases per listing page (at least one).
    #[inline]
    #[must_use]
    pub fn with_page_size(self, page_size: usize) -> Self {
        let mut inner = self.into_inner();
        inner.page_size = page_size.max(1);
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Restricts billing support to `types`.
    #[inline]
    #[must_use]
    pub fn with_supported_types(self, types: Vec<ProductType>) -> Self {
        let mut inner = self.into_inner();
        inner.supported_types = types;
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Adds a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn add_product(&self, product: Product) -> Result<()> {
        self.with_lock(|inner| inner.products.push(product))
    }

    /// Records an owned purchase.
    ///
    /// # Errors
    ///
    /// Returns a parse error if `data` cannot be decoded, or a lock error.
    pub fn add_purchase<D, G>(&self, product_type: ProductType, data: D, signature: G) -> Result<()>
    where
        D: Into<String>,
        G: Into<String>,
    {
        let record = OwnedRecord::decode(product_type, data.into(), signature.into())?;
        self.with_lock(|inner| inner.owned.push(record))
    }

    /// Simulates loss of the binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn disconnect(&self) -> Result<()> {
        self.with_lock(|inner| inner.connected = false)
    }

    /// Restores the binding after [`disconnect`](Self::disconnect).
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn reconnect(&self) -> Result<()> {
        self.with_lock(|inner| inner.connected = true)
    }

    /// Number of `purchases` calls answered so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn purchases_calls(&self) -> Result<usize> {
        self.with_lock(|inner| inner.purchases_calls)
    }

    /// Returns `true` if `product_id` is owned and not yet consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn is_owned(&self, product_id: &ProductId) -> Result<bool> {
        self.with_lock(|inner| inner.is_owned(product_id))
    }

    /// Consumes the service and returns its state, recovering from poison.
    fn into_inner(self) -> Inner {
        self.inner
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }

    /// Like [`with_lock`](Self::with_lock), failing if the binding is down.
    fn call<R>(&self, f: impl FnOnce(&mut Inner) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        if !inner.connected {
            tracing::debug!("billing call on disconnected service");
            return Err(KinAppError::RemoteBinding(
                "billing service disconnected".into(),
            ));
        }
        f(&mut inner)
    }

    /// Answers `is_billing_supported`.
    fn check_supported(&self, api_version: u32, product_type: ProductType) -> Result<ResponseCode> {
        self.call(|inner| Ok(inner.availability(api_version, product_type)))
    }

    /// Answers `sku_details`.
    fn lookup_details(
        &self,
        api_version: u32,
        product_type: ProductType,
        product_ids: &[ProductId],
    ) -> Result<SkuDetailsResponse> {
        self.call(|inner| inner.sku_details(api_version, product_type, product_ids))
    }

    /// Answers `buy_intent`.
    fn issue_intent(
        &self,
        api_version: u32,
        package_name: &str,
        product_id: &ProductId,
        product_type: ProductType,
    ) -> Result<BuyIntentResponse> {
        self.call(|inner| {
            Ok(inner.buy_intent(api_version, package_name, product_id, product_type))
        })
    }

    /// Answers `purchases`.
    fn list_page(
        &self,
        api_version: u32,
        product_type: ProductType,
        continuation_token: Option<&str>,
    ) -> Result<PurchasesPage> {
        self.call(|inner| Ok(inner.purchases(api_version, product_type, continuation_token)))
    }

    /// Answers `consume_purchase`.
    fn consume_token(&self, api_version: u32, purchase_token: &PurchaseToken) -> Result<ResponseCode> {
        self.call(|inner| Ok(inner.consume(api_version, purchase_token)))
    }
}

impl OwnedRecord {
    /// Decodes the blob to learn the product id and token.
    fn decode(product_type: ProductType, data: String, signature: String) -> Result<Self> {
        let purchase = parser::parse_purchase(&data)?;
        Ok(Self {
            product_type,
            product_id: purchase.product_id,
            token: purchase.purchase_token,
            data,
            signature,
            consumed: false,
        })
    }
}

impl Inner {
    /// Response code for a call about `product_type`.
    fn availability(&self, api_version: u32, product_type: ProductType) -> ResponseCode {
        if api_version < MIN_API_VERSION || !self.supported_types.contains(&product_type) {
            ResponseCode::BillingUnavailable
        } else {
            ResponseCode::Ok
        }
    }

    /// Returns `true` if an unconsumed purchase of `product_id` exists.
    fn is_owned(&self, product_id: &ProductId) -> bool {
        self.owned
            .iter()
            .any(|record| !record.consumed && record.product_id == *product_id)
    }

    /// Serializes the requested catalog entries, in request order.
    fn sku_details(
        &self,
        api_version: u32,
        product_type: ProductType,
        product_ids: &[ProductId],
    ) -> Result<SkuDetailsResponse> {
        let response_code = self.availability(api_version, product_type);
        if !response_code.is_ok() {
            return Ok(SkuDetailsResponse {
                response_code,
                item_details_list: Vec::new(),
            });
        }
        let mut item_details_list = Vec::with_capacity(product_ids.len());
        for id in product_ids {
            if let Some(product) = self
                .products
                .iter()
                .find(|product| product.product_id == *id && product.product_type == product_type)
            {
                item_details_list.push(product.to_json()?);
            }
        }
        Ok(SkuDetailsResponse {
            response_code,
            item_details_list,
        })
    }

    /// Issues a buy intent unless the product is unknown or already owned.
    fn buy_intent(
        &self,
        api_version: u32,
        package_name: &str,
        product_id: &ProductId,
        product_type: ProductType,
    ) -> BuyIntentResponse {
        let availability = self.availability(api_version, product_type);
        let response_code = if !availability.is_ok() {
            availability
        } else if !self.is_known(product_id, product_type) {
            ResponseCode::ItemUnavailable
        } else if self.is_owned(product_id) {
            ResponseCode::ItemAlreadyOwned
        } else {
            ResponseCode::Ok
        };
        let buy_intent = response_code
            .is_ok()
            .then(|| BuyIntent::new(format!("buy:{package_name}:{product_id}")));
        BuyIntentResponse {
            response_code,
            buy_intent,
        }
    }

    /// Returns `true` if `product_id` can be bought as `product_type`.
    fn is_known(&self, product_id: &ProductId, product_type: ProductType) -> bool {
        if product_id.is_test_purchase() {
            return product_id.as_inner() != TEST_PURCHASE_UNAVAILABLE;
        }
        self.products
            .iter()
            .any(|product| product.product_id == *product_id && product.product_type == product_type)
    }

    /// Answers one page of the owned-purchases listing.
    fn purchases(
        &mut self,
        api_version: u32,
        product_type: ProductType,
        continuation_token: Option<&str>,
    ) -> PurchasesPage {
        self.purchases_calls += 1;
        let availability = self.availability(api_version, product_type);
        if !availability.is_ok() {
            return PurchasesPage::failed(availability);
        }
        let offset = match continuation_token {
            None => 0,
            Some(token) => match token
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|offset| offset.parse::<usize>().ok())
            {
                Some(offset) => offset,
                None => {
                    tracing::debug!(token, "unknown continuation token");
                    return PurchasesPage::failed(ResponseCode::DeveloperError);
                }
            },
        };

        let listed: Vec<&OwnedRecord> = self
            .owned
            .iter()
            .filter(|record| !record.consumed && record.product_type == product_type)
            .collect();
        let end = offset.saturating_add(self.page_size).min(listed.len());
        let page = listed.get(offset..end).unwrap_or_default();
        let continuation_token = (end < listed.len()).then(|| format!("{TOKEN_PREFIX}{end}"));
        PurchasesPage::ok(
            page.iter().map(|record| record.data.clone()).collect(),
            page.iter().map(|record| record.signature.clone()).collect(),
            continuation_token,
        )
    }

    /// Consumes an owned purchase once.
    fn consume(&mut self, api_version: u32, purchase_token: &PurchaseToken) -> ResponseCode {
        if api_version < MIN_API_VERSION {
            return ResponseCode::BillingUnavailable;
        }
        if purchase_token.is_empty() {
            return ResponseCode::DeveloperError;
        }
        match self
            .owned
            .iter_mut()
            .find(|record| !record.consumed && record.token == *purchase_token)
        {
            Some(record) => {
                record.consumed = true;
                tracing::debug!(product_id = %record.product_id, "purchase consumed");
                ResponseCode::Ok
            }
            None => ResponseCode::ItemNotOwned,
        }
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> KinAppError {
    KinAppError::RemoteBinding(err.to_string().into())
}

// ── BlockingBillingService implementation ───────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingBillingService for InMemoryBillingService {
    #[inline]
    fn is_billing_supported(
        &self,
        api_version: u32,
        _package_name: &str,
        product_type: ProductType,
    ) -> Result<ResponseCode> {
        self.check_supported(api_version, product_type)
    }

    #[inline]
    fn sku_details(
        &self,
        api_version: u32,
        _package_name: &str,
        product_type: ProductType,
        product_ids: &[ProductId],
    ) -> Result<SkuDetailsResponse> {
        self.lookup_details(api_version, product_type, product_ids)
    }

    #[inline]
    fn buy_intent(
        &self,
        api_version: u32,
        package_name: &str,
        product_id: &ProductId,
        product_type: ProductType,
        _developer_payload: &str,
    ) -> Result<BuyIntentResponse> {
        self.issue_intent(api_version, package_name, product_id, product_type)
    }

    #[inline]
    fn purchases(
        &self,
        api_version: u32,
        _package_name: &str,
        product_type: ProductType,
        continuation_token: Option<&str>,
    ) -> Result<PurchasesPage> {
        self.list_page(api_version, product_type, continuation_token)
    }

    #[inline]
    fn consume_purchase(
        &self,
        api_version: u32,
        _package_name: &str,
        purchase_token: &PurchaseToken,
    ) -> Result<ResponseCode> {
        self.consume_token(api_version, purchase_token)
    }
}

// ── BillingService (async) implementation ───────────────────────────────

#[cfg(feature = "async")]
impl super::BillingService for InMemoryBillingService {
    #[inline]
    fn is_billing_supported(
        &self,
        api_version: u32,
        _package_name: &str,
        product_type: ProductType,
    ) -> impl Future<Output = Result<ResponseCode>> + Send {
        future::ready(self.check_supported(api_version, product_type))
    }

    #[inline]
    fn sku_details(
        &self,
        api_version: u32,
        _package_name: &str,
        product_type: ProductType,
        product_ids: &[ProductId],
    ) -> impl Future<Output = Result<SkuDetailsResponse>> + Send {
        future::ready(self.lookup_details(api_version, product_type, product_ids))
    }

    #[inline]
    fn buy_intent(
        &self,
        api_version: u32,
        package_name: &str,
        product_id: &ProductId,
        product_type: ProductType,
        _developer_payload: &str,
    ) -> impl Future<Output = Result<BuyIntentResponse>> + Send {
        future::ready(self.issue_intent(api_version, package_name, product_id, product_type))
    }

    #[inline]
    fn purchases(
        &self,
        api_version: u32,
        _package_name: &str,
        product_type: ProductType,
        continuation_token: Option<&str>,
    ) -> impl Future<Output = Result<PurchasesPage>> + Send {
        future::ready(self.list_page(api_version, product_type, continuation_token))
    }

    #[inline]
    fn consume_purchase(
        &self,
        api_version: u32,
        _package_name: &str,
        purchase_token: &PurchaseToken,
    ) -> impl Future<Output = Result<ResponseCode>> + Send {
        future::ready(self.consume_token(api_version, purchase_token))
    }
}
