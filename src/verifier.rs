//! Classification of purchase-flow completion events.
//!
//! [`PurchaseVerifier`] turns the `(request tag, result code, bundle)`
//! triple delivered at the end of an interactive purchase into exactly one
//! [`VerificationOutcome`].
//!
//! Products whose id starts with [`TEST_PURCHASE_PREFIX`] are accepted
//! without a signature, because the vendor never signs sandbox purchases.
//! Every such acceptance is logged at WARN level.

use crate::models::{
    Purchase, PurchaseFlowEvent, ResponseCode, TEST_PURCHASE_PREFIX, Verification,
    VerificationOutcome,
};
use crate::parser;
use crate::signature::SignatureVerifier;

/// Request tag used when launching the purchase flow.
pub const PURCHASE_REQUEST_CODE: i32 = 1001;

/// Platform result code of a completed flow.
pub const RESULT_OK: i32 = -1;

/// Platform result code of a flow the user backed out of.
pub const RESULT_CANCELED: i32 = 0;

/// Decides whether purchase-flow results are authentic.
///
/// Holds no mutable state; share it freely between threads.
#[derive(Debug, Clone)]
pub struct PurchaseVerifier {
    /// Key used to check signatures. `None` when no usable key was
    /// configured, in which case only test purchases verify.
    signature: Option<SignatureVerifier>,
    /// Tag identifying our purchase flow.
    request_code: i32,
}

impl PurchaseVerifier {
    /// Creates a verifier from the application's base64 public key.
    ///
    /// An empty or undecodable key is logged and leaves the verifier unable
    /// to accept anything but test purchases.
    #[must_use]
    pub fn new(public_key: &str) -> Self {
        let signature = if public_key.trim().is_empty() {
            tracing::warn!("no public key configured; only test purchases will verify");
            None
        } else {
            match SignatureVerifier::from_base64(public_key) {
                Ok(verifier) => Some(verifier),
                Err(err) => {
                    tracing::warn!(error = %err, "unusable public key; only test purchases will verify");
                    None
                }
            }
        };
        Self {
            signature,
            request_code: PURCHASE_REQUEST_CODE,
        }
    }

    /// Creates a verifier around an already decoded key.
    #[inline]
    #[must_use]
    pub const fn with_verifier(signature: SignatureVerifier) -> Self {
        Self {
            signature: Some(signature),
            request_code: PURCHASE_REQUEST_CODE,
        }
    }

    /// Overrides the request tag that identifies our purchase flow.
    #[inline]
    #[must_use]
    pub const fn request_code(mut self, request_code: i32) -> Self {
        self.request_code = request_code;
        self
    }

    /// Classifies a purchase-flow completion event.
    #[inline]
    #[must_use]
    pub fn verify(&self, event: &PurchaseFlowEvent) -> Verification {
        self.verify_parts(
            event.request_code,
            event.result_code,
            event.purchase_data(),
            event.signature(),
        )
    }

    /// Classifies a purchase-flow completion given as separate parts.
    #[must_use]
    pub fn verify_parts(
        &self,
        request_code: i32,
        result_code: i32,
        purchase_data: Option<&str>,
        signature: Option<&str>,
    ) -> Verification {
        if request_code != self.request_code {
            tracing::trace!(request_code, "event belongs to another request");
            return Verification::not_applicable();
        }
        match result_code {
            RESULT_CANCELED => {
                tracing::debug!("purchase flow cancelled by user");
                return Verification::rejected(VerificationOutcome::CanceledByUser);
            }
            RESULT_OK => {}
            other => {
                tracing::warn!(result_code = other, "purchase flow failed");
                return Verification::rejected(VerificationOutcome::PurchaseDataMissing);
            }
        }

        let Some(data) = purchase_data.filter(|data| !data.is_empty()) else {
            tracing::warn!("purchase flow succeeded without purchase data");
            return Verification::rejected(VerificationOutcome::PurchaseDataMissing);
        };
        let purchase = match parser::parse_purchase(data) {
            Ok(purchase) => purchase,
            Err(err) => {
                tracing::warn!(error = %err, "purchase data could not be decoded");
                return Verification::rejected(VerificationOutcome::PurchaseDataMissing);
            }
        };

        if self.is_authentic(&purchase, data, signature) {
            Verification::success(purchase)
        } else {
            Verification::rejected(VerificationOutcome::SignatureInvalid)
        }
    }

    /// Returns `true` if `purchase` (decoded from `data`) is a test purchase
    /// or `signature` is a valid signature of `data`.
    #[must_use]
    pub fn is_authentic(&self, purchase: &Purchase, data: &str, signature: Option<&str>) -> bool {
        if purchase.is_test_purchase() {
            tracing::warn!(
                product_id = %purchase.product_id,
                prefix = TEST_PURCHASE_PREFIX,
                "accepting unsigned test purchase"
            );
            return true;
        }
        let verified = match (self.signature.as_ref(), signature) {
            (Some(verifier), Some(sig)) => verifier.verify(data, sig),
            (None, _) => false,
            (Some(_), None) => {
                tracing::debug!("purchase data carries no signature");
                false
            }
        };
        if !verified {
            tracing::warn!(product_id = %purchase.product_id, "purchase signature rejected");
        }
        verified
    }

    /// Maps the response of a buy-intent call to an early outcome.
    ///
    /// Returns [`VerificationOutcome::AlreadyOwned`] for
    /// [`ResponseCode::ItemAlreadyOwned`], and `None` for every other code:
    /// those either start the flow or are errors for the caller.
    #[inline]
    #[must_use]
    pub fn buy_intent_outcome(code: ResponseCode) -> Option<Verification> {
        matches!(code, ResponseCode::ItemAlreadyOwned)
            .then(|| Verification::rejected(VerificationOutcome::AlreadyOwned))
    }
}
