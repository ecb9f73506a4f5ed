use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::client::strip_bearer_prefix;
use crate::api::{ApiClient, ApiError};
use crate::models::{Signup, User};
use crate::navigator::{Navigator, HOME_PATH};

use super::TokenStore;

/// Authentication lifecycle of the current client instance.
///
/// `Unresolved` only exists between construction and the first `restore`
/// call; afterwards the session is either `Authenticated` or `Anonymous`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unresolved,
    Anonymous,
    Authenticated(User),
}

/// Owner of the authenticated-user record and the session operations.
///
/// No other component mutates the user record; consumers read it through
/// `user()` and `is_authenticated()`.
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    state: SessionState,
    loading: bool,
}

impl SessionManager {
    pub fn new(api: ApiClient) -> Self {
        let store = api.token_store();
        let navigator = api.navigator();
        Self {
            api,
            store,
            navigator,
            state: SessionState::Unresolved,
            loading: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Derived from the user record; there is no way to set it directly.
    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// True while a session operation is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Resolve the persisted session at startup.
    ///
    /// Returns true when a stored token yielded an authenticated session. A
    /// missing token or a rejected identity fetch resolves to `Anonymous`.
    pub async fn restore(&mut self) -> bool {
        self.loading = true;
        let resolved = self.resolve_persisted_session().await;
        self.loading = false;

        match resolved {
            Some(user) => {
                info!(nickname = %user.nickname, "session restored");
                self.state = SessionState::Authenticated(user);
                true
            }
            None => {
                self.state = SessionState::Anonymous;
                false
            }
        }
    }

    async fn resolve_persisted_session(&self) -> Option<User> {
        if self.store.token().is_none() {
            debug!("no persisted token");
            return None;
        }
        match self.api.fetch_current_user().await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "stored token did not resolve to a user");
                None
            }
        }
    }

    /// Authenticate with the backend and load the user record.
    ///
    /// The issued token is taken from the `Authorization` response header
    /// (`Bearer ` prefix stripped) or the body's `accessToken` field; when
    /// neither is present the login fails and the session is left untouched.
    pub async fn login(&mut self, email: &str, password: &str, remember_me: bool) -> Result<()> {
        self.loading = true;
        let result = self.perform_login(email, password, remember_me).await;
        self.loading = false;

        let user = result?;
        info!(nickname = %user.nickname, "login succeeded");
        self.state = SessionState::Authenticated(user);
        Ok(())
    }

    async fn perform_login(&self, email: &str, password: &str, remember_me: bool) -> Result<User> {
        let response = self.api.login(email, password).await?;
        let body: LoginResponse = response.json().unwrap_or_default();

        let header_token = response
            .header("authorization")
            .filter(|value| !value.is_empty())
            .map(|value| strip_bearer_prefix(value).to_string());

        let token = header_token
            .or(body.access_token)
            .ok_or(ApiError::MissingToken)?;

        self.store.set_token(&token)?;
        self.store.set_remember_me(remember_me)?;

        match body.user {
            Some(user) => Ok(user),
            // The login response may omit the user record; resolve it separately
            None => self.api.fetch_current_user().await,
        }
    }

    /// Register a new account.
    ///
    /// Never authenticates the session; callers navigate to login afterwards.
    pub async fn signup(&mut self, signup: &Signup) -> Result<()> {
        self.loading = true;
        let result = self.api.signup(signup).await;
        self.loading = false;
        result
    }

    /// End the session.
    ///
    /// The server-side logout call invalidates the refresh cookie and is
    /// best effort: its failure is logged, never propagated, and the local
    /// teardown runs regardless.
    pub async fn logout(&mut self) {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "server logout call failed");
        }

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear token storage");
        }
        self.state = SessionState::Anonymous;
        self.navigator.redirect(HOME_PATH);
    }
}

// Internal API response types for parsing

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    user: Option<User>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::api::transport::fakes::{json_response, response, with_header, FakeTransport};
    use crate::api::transport::{HttpTransport, RequestBody};
    use crate::auth::MemoryTokenStore;
    use crate::models::UserRole;
    use crate::navigator::fakes::RecordingNavigator;

    use super::*;

    const BASE: &str = "http://backend.test";

    fn manager_with(
        transport: Arc<dyn HttpTransport>,
        store: Arc<MemoryTokenStore>,
        navigator: Arc<RecordingNavigator>,
    ) -> SessionManager {
        SessionManager::new(ApiClient::with_parts(BASE, transport, store, navigator))
    }

    fn user_json() -> serde_json::Value {
        json!({"userId": "u-1", "nickname": "mina", "userRole": "ROLE_FREELANCER"})
    }

    #[test]
    fn test_authentication_flag_is_derived() {
        let session = manager_with(
            FakeTransport::new(|_| Ok(response(500))),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RecordingNavigator::default()),
        );
        assert_eq!(*session.state(), SessionState::Unresolved);
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_restore_without_token_resolves_anonymous() {
        let transport = FakeTransport::new(|_| Ok(json_response(200, user_json())));
        let mut session = manager_with(
            transport.clone(),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RecordingNavigator::default()),
        );

        assert!(!session.restore().await);
        assert_eq!(*session.state(), SessionState::Anonymous);
        // No network call is made without a token
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_restore_with_valid_token_resolves_user() {
        let transport = FakeTransport::new(|_| Ok(json_response(200, user_json())));
        let store = Arc::new(MemoryTokenStore::new());
        store.set_token("tok-0").unwrap();
        let mut session = manager_with(
            transport,
            store,
            Arc::new(RecordingNavigator::default()),
        );

        assert!(session.restore().await);
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().nickname, "mina");
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_resolves_anonymous() {
        let transport = FakeTransport::new(|_| Ok(response(500)));
        let store = Arc::new(MemoryTokenStore::new());
        store.set_token("tok-0").unwrap();
        let mut session = manager_with(
            transport,
            store,
            Arc::new(RecordingNavigator::default()),
        );

        assert!(!session.restore().await);
        assert_eq!(*session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_with_expired_token_and_dead_refresh_clears_storage() {
        let transport = FakeTransport::new(|request| {
            if request.url.ends_with("/auth/refresh") {
                return Ok(response(404));
            }
            Ok(response(401))
        });
        let store = Arc::new(MemoryTokenStore::new());
        store.set_token("tok-stale").unwrap();
        let navigator = Arc::new(RecordingNavigator::default());
        let mut session = manager_with(transport, store.clone(), navigator.clone());

        assert!(!session.restore().await);
        assert_eq!(*session.state(), SessionState::Anonymous);
        assert!(store.token().is_none());
        assert_eq!(navigator.targets(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn test_login_reads_token_from_header_and_embedded_user() {
        let transport = FakeTransport::new(|request| {
            if request.url.ends_with("/auth/login") {
                return Ok(with_header(
                    json_response(200, json!({"user": user_json()})),
                    "authorization",
                    "Bearer tok-login",
                ));
            }
            Ok(response(404))
        });
        let store = Arc::new(MemoryTokenStore::new());
        let mut session = manager_with(
            transport.clone(),
            store.clone(),
            Arc::new(RecordingNavigator::default()),
        );
        session.restore().await;

        session.login("mina@example.com", "pw", true).await.unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().nickname, "mina");
        assert_eq!(store.token().as_deref(), Some("tok-login"));
        assert!(store.remember_me());
        assert!(!session.is_loading());

        // The login payload carries the credentials
        let requests = transport.requests();
        match &requests[0].body {
            RequestBody::Json(value) => {
                assert_eq!(value["email"], "mina@example.com");
                assert_eq!(value["password"], "pw");
            }
            other => panic!("expected JSON body, got {:?}", other),
        }
        // Embedded user record, so no follow-up identity fetch
        assert_eq!(transport.count_to("/user/me"), 0);
    }

    #[tokio::test]
    async fn test_login_falls_back_to_body_token_and_identity_fetch() {
        let transport = FakeTransport::new(|request| {
            if request.url.ends_with("/auth/login") {
                return Ok(json_response(200, json!({"accessToken": "tok-body"})));
            }
            if request.url.ends_with("/user/me") {
                return Ok(json_response(200, user_json()));
            }
            Ok(response(404))
        });
        let store = Arc::new(MemoryTokenStore::new());
        let mut session = manager_with(
            transport.clone(),
            store.clone(),
            Arc::new(RecordingNavigator::default()),
        );
        session.restore().await;

        session.login("mina@example.com", "pw", false).await.unwrap();

        assert!(session.is_authenticated());
        // Body tokens are stored verbatim
        assert_eq!(store.token().as_deref(), Some("tok-body"));
        assert!(!store.remember_me());
        assert_eq!(transport.count_to("/user/me"), 1);
    }

    #[tokio::test]
    async fn test_login_without_token_anywhere_fails_and_stays_anonymous() {
        let transport = FakeTransport::new(|request| {
            if request.url.ends_with("/auth/login") {
                return Ok(json_response(200, json!({})));
            }
            Ok(response(404))
        });
        let store = Arc::new(MemoryTokenStore::new());
        let mut session = manager_with(
            transport,
            store.clone(),
            Arc::new(RecordingNavigator::default()),
        );
        session.restore().await;

        let err = session
            .login("mina@example.com", "pw", true)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::MissingToken)
        ));
        assert_eq!(*session.state(), SessionState::Anonymous);
        assert!(store.token().is_none());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_failed_login_surfaces_server_error() {
        let transport = FakeTransport::new(|_| Ok(response(500)));
        let mut session = manager_with(
            transport,
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RecordingNavigator::default()),
        );
        session.restore().await;

        let err = session
            .login("mina@example.com", "pw", false)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::ServerError(_))
        ));
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_signup_never_stores_a_token() {
        let transport = FakeTransport::new(|request| {
            if request.url.ends_with("/auth/signup") {
                return Ok(json_response(200, json!({"userId": "u-9"})));
            }
            Ok(response(404))
        });
        let store = Arc::new(MemoryTokenStore::new());
        let mut session = manager_with(
            transport.clone(),
            store.clone(),
            Arc::new(RecordingNavigator::default()),
        );
        session.restore().await;

        let signup = Signup {
            email: "new@example.com".to_string(),
            password: "pw".to_string(),
            nickname: "newbie".to_string(),
            user_role: UserRole::Client,
        };
        session.signup(&signup).await.unwrap();

        assert!(!session.is_authenticated());
        assert!(store.token().is_none());

        let requests = transport.requests();
        match &requests[0].body {
            RequestBody::Json(value) => {
                assert_eq!(value["userRole"], "ROLE_CLIENT");
                assert_eq!(value["email"], "new@example.com");
            }
            other => panic!("expected JSON body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_logout_clears_local_state_even_when_server_call_fails() {
        let transport = FakeTransport::new(|request| {
            if request.url.ends_with("/auth/login") {
                return Ok(with_header(
                    json_response(200, json!({"user": user_json()})),
                    "authorization",
                    "tok-login",
                ));
            }
            if request.url.ends_with("/auth/logout") {
                return Ok(response(500));
            }
            Ok(response(404))
        });
        let store = Arc::new(MemoryTokenStore::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let mut session = manager_with(transport, store.clone(), navigator.clone());
        session.restore().await;
        session.login("mina@example.com", "pw", true).await.unwrap();
        assert!(session.is_authenticated());

        session.logout().await;

        assert!(!session.is_authenticated());
        assert_eq!(*session.state(), SessionState::Anonymous);
        assert!(store.token().is_none());
        assert!(!store.remember_me());
        assert_eq!(navigator.targets(), vec!["/".to_string()]);
    }
}
