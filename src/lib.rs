//! Verification and restoration of Google Play in-app billing purchases.
//!
//! This crate decodes the JSON records the billing service hands out,
//! checks their RSA signatures, classifies purchase-flow results, and
//! restores owned purchases across continuation-token pages. The platform
//! binding itself is abstracted behind [`billing::BillingService`] /
//! [`billing::BlockingBillingService`].

pub mod billing;
pub mod connection;
pub mod error;
pub mod kin_app;
pub mod models;
pub mod parser;
pub mod restore;
pub mod signature;
pub mod verifier;

#[cfg(test)]
mod test_keys;
