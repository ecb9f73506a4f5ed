//! Client core for the FreeWave freelancer/client marketplace.
//!
//! This crate implements the session and transport layer the FreeWave front
//! ends are built on:
//!
//! - [`ApiClient`]: authenticated HTTP transport - attaches the persisted
//!   bearer token to every request and recovers from an expired token with a
//!   single refresh-and-replay cycle
//! - [`SessionManager`]: owner of the authenticated-user record and the
//!   login / signup / logout / restore operations
//! - [`TokenStore`] implementations: OS keychain, JSON file, in-memory
//! - Typed resource methods for the profile, skills, and portfolio endpoints
//!
//! The backend contract, UI rendering, and form validation live elsewhere;
//! hosts plug routing in through the [`Navigator`] seam.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use freewave_client::{ApiClient, Config, FileTokenStore, SessionManager, TokenStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(Config::data_dir()?));
//! let api = ApiClient::new(&config, store)?;
//!
//! let mut session = SessionManager::new(api.clone());
//! if !session.restore().await {
//!     session.login("mina@example.com", "secret", true).await?;
//! }
//!
//! let profile = api.fetch_profile().await?;
//! println!("logged in as {}", profile.nickname);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigator;

pub use api::transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MultipartField, ReqwestTransport,
    RequestBody, StatusCode,
};
pub use api::{ApiClient, ApiError};
pub use auth::{
    FileTokenStore, KeyringTokenStore, MemoryTokenStore, SessionManager, SessionState, TokenStore,
};
pub use config::Config;
pub use models::{Portfolio, Profile, ProfileUpdate, Signup, User, UserRole};
pub use navigator::{Navigator, NoopNavigator};
