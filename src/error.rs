//! Error types for the KinApp billing library.

use crate::connection::ConnectionState;
use crate::models::ResponseCode;

/// All errors that can occur when using the KinApp billing library.
///
/// Verification failures are not errors: a rejected signature is reported
/// as [`crate::models::VerificationOutcome::SignatureInvalid`].
#[derive(Debug, thiserror::Error)]
pub enum KinAppError {
    /// Malformed JSON in a vendor payload.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed JSON with an unexpected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(&'static str),

    /// The underlying billing service call failed or the binding is gone.
    #[error("remote billing service error: {0}")]
    RemoteBinding(Box<dyn core::error::Error + Send + Sync>),

    /// The billing service answered with a non-OK response code.
    #[error("billing service returned {code}")]
    Api {
        /// Response code returned by the vendor.
        code: ResponseCode,
    },

    /// A service call was attempted before the connection became ready.
    #[error("billing service is not connected (state: {state})")]
    NotConnected {
        /// Connection state at the time of the call.
        state: ConnectionState,
    },

    /// The public key could not be decoded.
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// Restoration hit the configured page limit before the vendor stopped
    /// returning continuation tokens.
    #[error("restoration stopped after {pages} pages: page limit reached")]
    PageLimitExceeded {
        /// Number of pages fetched before giving up.
        pages: usize,
    },

    /// Restoration was cancelled between pages.
    #[error("restoration cancelled")]
    Cancelled,

    /// Client configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, KinAppError>;
