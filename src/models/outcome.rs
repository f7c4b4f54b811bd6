//! Purchase-flow verification outcomes.

use serde::{Deserialize, Serialize};

use super::Purchase;

/// Result of classifying one purchase-flow completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    /// The event belongs to another request; the caller should forward it.
    NotApplicable,
    /// The purchase is authentic.
    Success,
    /// The user cancelled the flow.
    CanceledByUser,
    /// The flow reported success without usable purchase data.
    PurchaseDataMissing,
    /// The product is already owned; reported before any flow starts.
    AlreadyOwned,
    /// The purchase data is not signed by the configured key.
    SignatureInvalid,
}

impl VerificationOutcome {
    /// Returns the symbolic name of the outcome.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotApplicable => "NOT_APPLICABLE",
            Self::Success => "SUCCESS",
            Self::CanceledByUser => "CANCELED_BY_USER",
            Self::PurchaseDataMissing => "PURCHASE_DATA_MISSING",
            Self::AlreadyOwned => "ALREADY_OWNED",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
        }
    }
}

impl core::fmt::Display for VerificationOutcome {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outcome paired with the purchase it concerns.
///
/// Only [`VerificationOutcome::Success`] carries a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Classified outcome.
    outcome: VerificationOutcome,
    /// Verified purchase, present only on success.
    purchase: Option<Purchase>,
}

impl Verification {
    /// The event was not addressed to the purchase flow.
    #[inline]
    #[must_use]
    pub const fn not_applicable() -> Self {
        Self {
            outcome: VerificationOutcome::NotApplicable,
            purchase: None,
        }
    }

    /// An authentic purchase.
    #[inline]
    #[must_use]
    pub const fn success(purchase: Purchase) -> Self {
        Self {
            outcome: VerificationOutcome::Success,
            purchase: Some(purchase),
        }
    }

    /// A non-success outcome. Passing [`VerificationOutcome::Success`] here
    /// yields a success without a purchase, which callers never construct.
    #[inline]
    #[must_use]
    pub const fn rejected(outcome: VerificationOutcome) -> Self {
        Self {
            outcome,
            purchase: None,
        }
    }

    /// Returns the outcome.
    #[inline]
    #[must_use]
    pub const fn outcome(&self) -> VerificationOutcome {
        self.outcome
    }

    /// Returns the verified purchase, if any.
    #[inline]
    #[must_use]
    pub const fn purchase(&self) -> Option<&Purchase> {
        self.purchase.as_ref()
    }

    /// Consumes the verification and returns the purchase, if any.
    #[inline]
    #[must_use]
    pub fn into_purchase(self) -> Option<Purchase> {
        self.purchase
    }

    /// Returns `false` if the event must be forwarded elsewhere.
    #[inline]
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self.outcome, VerificationOutcome::NotApplicable)
    }

    /// Returns `true` for an authentic purchase.
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, VerificationOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductId;

    #[test]
    fn outcome_serde_names() {
        let json = serde_json::to_string(&VerificationOutcome::CanceledByUser).unwrap();
        assert_eq!(json, r#""CANCELED_BY_USER""#);
        let outcome: VerificationOutcome =
            serde_json::from_str(r#""SIGNATURE_INVALID""#).unwrap();
        assert_eq!(outcome, VerificationOutcome::SignatureInvalid);
    }

    #[test]
    fn display_matches_serde_name() {
        for outcome in [
            VerificationOutcome::NotApplicable,
            VerificationOutcome::Success,
            VerificationOutcome::CanceledByUser,
            VerificationOutcome::PurchaseDataMissing,
            VerificationOutcome::AlreadyOwned,
            VerificationOutcome::SignatureInvalid,
        ] {
            let json = serde_json::to_string(&outcome).unwrap();
            assert_eq!(json, format!("\"{outcome}\""));
        }
    }

    #[test]
    fn success_carries_purchase() {
        let purchase = Purchase {
            product_id: ProductId::from("gas"),
            ..Purchase::default()
        };
        let verification = Verification::success(purchase.clone());
        assert!(verification.is_success());
        assert!(verification.is_handled());
        assert_eq!(verification.purchase(), Some(&purchase));
        assert_eq!(verification.into_purchase(), Some(purchase));
    }

    #[test]
    fn not_applicable_is_unhandled() {
        let verification = Verification::not_applicable();
        assert!(!verification.is_handled());
        assert!(verification.purchase().is_none());
    }

    #[test]
    fn rejected_has_no_purchase() {
        let verification = Verification::rejected(VerificationOutcome::SignatureInvalid);
        assert_eq!(verification.outcome(), VerificationOutcome::SignatureInvalid);
        assert!(verification.purchase().is_none());
        assert!(!verification.is_success());
    }
}
