//! Typed REST client for the SlotSwapper server.
//!
//! Every call attaches the caller's bearer credential, decodes the JSON
//! response into [`slotswap_types`] models and maps non-2xx statuses onto
//! [`ApiError`].

pub mod client;
pub mod error;

pub use client::{ApiClient, CredentialProvider};
pub use error::ApiError;
