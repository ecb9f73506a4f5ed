//! Host-navigation seam.
//!
//! The browser client this backend was built for performs full-page
//! redirects: to `/login` when the session is unrecoverable, to `/` after
//! logout. A library cannot navigate, so the redirect side effect is
//! injected and hosts map `redirect` onto their own routing.

use tracing::info;

/// Where the transport sends the user when the session is unrecoverable.
pub const LOGIN_PATH: &str = "/login";

/// Landing page after logout.
pub const HOME_PATH: &str = "/";

pub trait Navigator: Send + Sync {
    /// Ask the host to navigate to `path`.
    ///
    /// A side effect, never a substitute for error propagation: callers
    /// still see the failure that caused the redirect.
    fn redirect(&self, path: &str);
}

/// Default navigator for hosts without routing; records the intent in the log.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect(&self, path: &str) {
        info!(path = path, "navigation requested");
    }
}
