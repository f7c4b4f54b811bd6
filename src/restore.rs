//! Paginated restoration of owned purchases.
//!
//! The billing service lists owned purchases in pages chained by
//! continuation tokens. [`Restoration`] accumulates those pages in vendor
//! order and enforces the guards in [`RestoreOptions`]; the facade drives
//! it with an explicit loop so a long listing never grows the stack.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{KinAppError, Result};
use crate::models::{Purchase, PurchasesPage};
use crate::parser;
use crate::verifier::PurchaseVerifier;

/// Page limit applied when none is configured.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Cooperative cancellation flag shared between a caller and a
/// restoration in progress.
///
/// Clones observe the same flag. Cancellation is checked between pages.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called on any
    /// clone.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Guards applied to one restoration.
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Maximum number of pages to request.
    max_pages: Option<usize>,
    /// Flag checked before each page request.
    cancel: Option<CancelFlag>,
}

impl RestoreOptions {
    /// Options with the default page limit and no cancellation.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of pages requested.
    #[inline]
    #[must_use]
    pub const fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Attaches a cancellation flag.
    #[inline]
    #[must_use]
    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Effective page limit.
    #[inline]
    #[must_use]
    pub fn page_limit(&self) -> usize {
        self.max_pages.unwrap_or(DEFAULT_MAX_PAGES)
    }
}

/// One purchase restored together with its raw blob and signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredRecord {
    /// Decoded purchase.
    pub purchase: Purchase,
    /// Raw JSON the purchase was decoded from.
    pub data: String,
    /// Signature at the same index, if the page carried one.
    pub signature: Option<String>,
}

/// Accumulator for one paginated restoration.
#[derive(Debug)]
pub struct Restoration {
    /// Guards for this run.
    options: RestoreOptions,
    /// Pages absorbed so far.
    pages: usize,
    /// Records in vendor order.
    records: Vec<RestoredRecord>,
}

impl Restoration {
    /// Starts an empty restoration.
    #[inline]
    #[must_use]
    pub const fn new(options: RestoreOptions) -> Self {
        Self {
            options,
            pages: 0,
            records: Vec::new(),
        }
    }

    /// Checks the guards before another page is requested.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::Cancelled`] if the flag is set, or
    /// [`KinAppError::PageLimitExceeded`] if the page limit is used up.
    pub fn check_continue(&self) -> Result<()> {
        if self
            .options
            .cancel
            .as_ref()
            .is_some_and(CancelFlag::is_cancelled)
        {
            tracing::debug!(pages = self.pages, "restoration cancelled");
            return Err(KinAppError::Cancelled);
        }
        if self.pages >= self.options.page_limit() {
            tracing::warn!(pages = self.pages, "restoration page limit reached");
            return Err(KinAppError::PageLimitExceeded { pages: self.pages });
        }
        Ok(())
    }

    /// Appends one page and returns the continuation token, if any.
    ///
    /// # Errors
    ///
    /// Returns [`KinAppError::Api`] for a non-OK page and a parse error for a
    /// blob that cannot be decoded.
    pub fn absorb(&mut self, page: PurchasesPage) -> Result<Option<String>> {
        self.pages += 1;
        if !page.response_code.is_ok() {
            tracing::warn!(
                page = self.pages,
                code = %page.response_code,
                "purchase listing failed"
            );
            return Err(KinAppError::Api {
                code: page.response_code,
            });
        }
        if page.signature_list.len() != page.purchase_data_list.len() {
            tracing::debug!(
                data = page.purchase_data_list.len(),
                signatures = page.signature_list.len(),
                "signature list length differs from data list"
            );
        }
        let mut signatures = page.signature_list.into_iter();
        self.records.reserve(page.purchase_data_list.len());
        for data in page.purchase_data_list {
            let purchase = parser::parse_purchase(&data)?;
            self.records.push(RestoredRecord {
                purchase,
                data,
                signature: signatures.next(),
            });
        }
        tracing::debug!(
            page = self.pages,
            total = self.records.len(),
            more = page.continuation_token.is_some(),
            "absorbed purchases page"
        );
        Ok(page.continuation_token.filter(|token| !token.is_empty()))
    }

    /// Number of pages absorbed so far.
    #[inline]
    #[must_use]
    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// Finishes the restoration, returning every purchase in vendor order.
    #[inline]
    #[must_use]
    pub fn into_purchases(self) -> Vec<Purchase> {
        self.records
            .into_iter()
            .map(|record| record.purchase)
            .collect()
    }

    /// Finishes the restoration, returning the raw records in vendor order.
    #[inline]
    #[must_use]
    pub fn into_records(self) -> Vec<RestoredRecord> {
        self.records
    }

    /// Finishes the restoration, keeping only purchases that pass
    /// authenticity checks. Rejected records are logged and dropped.
    #[must_use]
    pub fn into_verified(self, verifier: &PurchaseVerifier) -> Vec<Purchase> {
        let total = self.records.len();
        let verified: Vec<Purchase> = self
            .records
            .into_iter()
            .filter(|record| {
                verifier.is_authentic(&record.purchase, &record.data, record.signature.as_deref())
            })
            .map(|record| record.purchase)
            .collect();
        if verified.len() != total {
            tracing::warn!(
                rejected = total - verified.len(),
                kept = verified.len(),
                "dropped restored purchases with invalid signatures"
            );
        }
        verified
    }
}
