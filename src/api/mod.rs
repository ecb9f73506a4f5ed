//! REST API client module for the FreeWave backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! marketplace API: authentication, profile, résumé skill, and portfolio
//! endpoints.
//!
//! The API uses bearer-token authentication; an expired token is renewed
//! through the cookie-authenticated refresh endpoint.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
