//! Request and response bodies for the HTTP API.
//!
//! Timestamps serialize as RFC 3339 via `chrono`'s serde support.

pub mod requests;
pub mod responses;
