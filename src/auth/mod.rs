//! Authentication module for managing the user session and token storage.
//!
//! This module provides:
//! - `SessionManager`: the login/signup/logout lifecycle and session state
//! - `TokenStore`: durable access-token storage (keychain, file, or memory)
//!
//! The persisted token survives restarts; `SessionManager::restore` turns it
//! back into an authenticated session at startup.

pub mod session;
pub mod store;

pub use session::{SessionManager, SessionState};
pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
