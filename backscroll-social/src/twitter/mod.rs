//! Twitter154 (RapidAPI) user timelines.
//!
//! The API hands out a `continuation_token` per page and throttles per key
//! with HTTP 429; the source rotates its key through the injected
//! [`CredentialProvider`](crate::credentials::CredentialProvider) before
//! reporting the throttle.
pub mod client;
pub mod source;
pub mod types;

pub use client::Twitter154Api;
pub use source::Twitter154Source;
