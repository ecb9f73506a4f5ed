//! API client for the FreeWave marketplace backend.
//!
//! `ApiClient` owns the authenticated transport: it attaches the persisted
//! bearer token to every outgoing request and, when a request comes back
//! 401, runs a single token-refresh-and-replay cycle before giving up.
//! Typed methods cover the auth, user, profile, skills, and portfolio
//! endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::HeaderValue;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::config::Config;
use crate::models::{Portfolio, Profile, ProfileUpdate, Signup, User};
use crate::navigator::{Navigator, NoopNavigator, LOGIN_PATH};

use super::transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MultipartField, ReqwestTransport, RequestBody,
};
use super::ApiError;

// ============================================================================
// Endpoints
// ============================================================================

const LOGIN_ENDPOINT: &str = "/api/v1/auth/login";
const SIGNUP_ENDPOINT: &str = "/api/v1/auth/signup";
const LOGOUT_ENDPOINT: &str = "/api/v1/auth/logout";
const REFRESH_ENDPOINT: &str = "/api/v1/auth/refresh";
const CURRENT_USER_ENDPOINT: &str = "/api/v1/user/me";
const PROFILE_ENDPOINT: &str = "/api/v1/users/me";
const PROFILE_UPDATE_ENDPOINT: &str = "/api/v1/users/profiles";
const PROFILE_IMAGE_ENDPOINT: &str = "/api/v1/users/profiles/images";
const BIO_ENDPOINT: &str = "/api/v1/users/profiles/bio";
const SKILLS_ENDPOINT: &str = "/api/v1/resumes/skills";
const PORTFOLIO_ENDPOINT: &str = "/api/v1/portfolio";

/// Response headers that may carry a refreshed access token, checked in order
const REFRESH_TOKEN_HEADERS: [&str; 3] = ["authorization", "access-token", "x-access-token"];

/// Strip the conventional `Bearer ` prefix from a token header value.
/// Values without the prefix pass through verbatim.
pub(crate) fn strip_bearer_prefix(value: &str) -> &str {
    value.strip_prefix("Bearer ").unwrap_or(value)
}

/// API client for the FreeWave backend.
/// Clone is cheap - the transport, store, and refresh gate are shared Arcs.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    base_url: String,
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a client against the configured backend with the real
    /// reqwest transport.
    pub fn new(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let transport =
            ReqwestTransport::with_timeout(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::with_parts(
            config.base_url.clone(),
            Arc::new(transport),
            store,
            Arc::new(NoopNavigator),
        ))
    }

    /// Assemble a client from explicit parts. Hosts use this to supply their
    /// own navigator; tests substitute scripted transports and stores.
    pub fn with_parts(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            transport,
            store,
            navigator,
            base_url,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    /// The token storage shared with this client.
    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    pub(crate) fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::clone(&self.navigator)
    }

    // ===== Request execution =====

    /// Execute a request against the backend, attaching the persisted bearer
    /// token when one exists.
    ///
    /// A 401 triggers at most one refresh-and-replay: the refresh endpoint
    /// is called (its cookie credential rides along in the transport), the
    /// new token is persisted, and the original request is resent once with
    /// the rewritten Authorization header. A 401 on the replay, or any other
    /// failure status, propagates to the caller.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<HttpResponse> {
        let request =
            HttpRequest::new(method, format!("{}{}", self.base_url, path)).with_body(body);

        let token = self.store.token();
        let first = self
            .transport
            .execute(
                request
                    .clone()
                    .authorized(self.bearer_value(token.as_deref())?.as_ref()),
            )
            .await?;

        if first.status.as_u16() != 401 {
            return Self::check_response(first);
        }

        // First 401: one refresh attempt, then one replay. An unrecoverable
        // refresh tears the session down and still surfaces the original 401.
        let refreshed = match self.refresh_access_token(token.as_deref()).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(path = path, error = %e, "token refresh failed, clearing session");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "failed to clear token storage");
                }
                self.navigator.redirect(LOGIN_PATH);
                return Err(ApiError::Unauthorized.into());
            }
        };

        let replay = self
            .transport
            .execute(request.authorized(self.bearer_value(Some(&refreshed))?.as_ref()))
            .await?;

        // A second 401 is final; never a second refresh.
        Self::check_response(replay)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, RequestBody::Empty).await?;
        response
            .json()
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body).context("Failed to serialize request body")?;
        let response = self.send(Method::POST, path, RequestBody::Json(body)).await?;
        response
            .json()
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let body = serde_json::to_value(body).context("Failed to serialize request body")?;
        let response = self.send(Method::PUT, path, RequestBody::Json(body)).await?;
        response
            .json()
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, RequestBody::Empty).await?;
        Ok(())
    }

    fn bearer_value(&self, token: Option<&str>) -> Result<Option<HeaderValue>> {
        match token {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Access token is not a valid header value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Map failure statuses onto the error taxonomy; success passes through.
    fn check_response(response: HttpResponse) -> Result<HttpResponse> {
        if response.status.is_success() {
            Ok(response)
        } else {
            let status = response.status;
            let body = response.text();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Mint a new access token from the refresh endpoint.
    ///
    /// Refreshes are single-flight: the gate serializes callers, and a
    /// caller that waited behind a completed refresh reuses the newer stored
    /// token instead of spending the refresh credential again. `observed` is
    /// the token the failed request was sent with.
    async fn refresh_access_token(&self, observed: Option<&str>) -> Result<String> {
        let _guard = self.refresh_gate.lock().await;

        if let Some(current) = self.store.token() {
            if observed != Some(current.as_str()) {
                debug!("access token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        debug!("refreshing access token");

        // No Authorization header: the refresh credential is the ambient
        // same-site cookie, sent by the transport automatically.
        let request = HttpRequest::new(
            Method::POST,
            format!("{}{}", self.base_url, REFRESH_ENDPOINT),
        )
        .with_body(RequestBody::Json(serde_json::json!({})));

        let response = self.transport.execute(request).await?;
        if !response.status.is_success() {
            return Err(ApiError::from_status(response.status, &response.text()).into());
        }

        let raw = Self::extract_refreshed_token(&response).ok_or(ApiError::MissingToken)?;
        let token = strip_bearer_prefix(&raw).to_string();
        self.store.set_token(&token)?;
        Ok(token)
    }

    /// Locate a refreshed token: designated headers first, then the body.
    fn extract_refreshed_token(response: &HttpResponse) -> Option<String> {
        for name in REFRESH_TOKEN_HEADERS {
            if let Some(value) = response.header(name) {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }

        response
            .json::<RefreshResponse>()
            .ok()
            .and_then(|body| body.access_token)
    }

    // ===== Auth =====

    /// Send credentials to the login endpoint and return the raw response.
    /// Token extraction and session bookkeeping live in `SessionManager`.
    pub async fn login(&self, email: &str, password: &str) -> Result<HttpResponse> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });
        self.send(Method::POST, LOGIN_ENDPOINT, RequestBody::Json(body))
            .await
    }

    /// Register a new account. The response acknowledges creation; no token
    /// is issued.
    pub async fn signup(&self, signup: &Signup) -> Result<()> {
        let body = serde_json::to_value(signup).context("Failed to serialize signup payload")?;
        self.send(Method::POST, SIGNUP_ENDPOINT, RequestBody::Json(body))
            .await?;
        Ok(())
    }

    /// Ask the server to invalidate its refresh state for this session.
    pub async fn logout(&self) -> Result<()> {
        self.send(
            Method::POST,
            LOGOUT_ENDPOINT,
            RequestBody::Json(serde_json::json!({})),
        )
        .await?;
        Ok(())
    }

    // ===== User & profile =====

    /// Fetch the authenticated identity
    pub async fn fetch_current_user(&self) -> Result<User> {
        self.get(CURRENT_USER_ENDPOINT).await
    }

    /// Fetch the full profile record (identity plus bio, skills, image)
    pub async fn fetch_profile(&self) -> Result<Profile> {
        self.get(PROFILE_ENDPOINT).await
    }

    /// Apply a partial profile update; returns the updated record
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        self.put(PROFILE_UPDATE_ENDPOINT, update).await
    }

    /// Replace the profile bio
    pub async fn update_bio(&self, bio: &str) -> Result<()> {
        let body = serde_json::json!({ "bio": bio });
        self.send(Method::PUT, BIO_ENDPOINT, RequestBody::Json(body))
            .await?;
        Ok(())
    }

    /// Upload a new profile image; returns the URL it is served from
    pub async fn upload_profile_image(
        &self,
        image: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<String> {
        let fields = vec![MultipartField::file("file", filename, content_type, image)];
        let response = self
            .send(
                Method::PUT,
                PROFILE_IMAGE_ENDPOINT,
                RequestBody::Multipart(fields),
            )
            .await?;

        let parsed: ImageResponse = response
            .json()
            .context("Failed to parse image upload response")?;
        Ok(parsed.image_url)
    }

    // ===== Skills =====

    /// Fetch the résumé skill list
    pub async fn fetch_skills(&self) -> Result<Vec<String>> {
        let response: SkillsResponse = self.get(SKILLS_ENDPOINT).await?;
        Ok(response.skills)
    }

    /// Replace the résumé skill list
    pub async fn update_skills(&self, skills: &[String]) -> Result<()> {
        let body = serde_json::json!({ "skills": skills });
        self.send(Method::PUT, SKILLS_ENDPOINT, RequestBody::Json(body))
            .await?;
        Ok(())
    }

    /// Remove a single skill by name
    pub async fn delete_skill(&self, skill: &str) -> Result<()> {
        self.delete(&format!("{}/{}", SKILLS_ENDPOINT, skill)).await
    }

    // ===== Portfolio =====

    /// Fetch all portfolio entries for the current user
    pub async fn fetch_portfolios(&self) -> Result<Vec<Portfolio>> {
        self.get(PORTFOLIO_ENDPOINT).await
    }

    /// Upload a portfolio document with its metadata
    pub async fn add_portfolio(
        &self,
        title: &str,
        description: &str,
        pdf: Vec<u8>,
    ) -> Result<Portfolio> {
        let fields = vec![
            MultipartField::file("file", "portfolio.pdf", "application/pdf", pdf),
            MultipartField::text("title", title),
            MultipartField::text("description", description),
        ];
        let response = self
            .send(Method::POST, PORTFOLIO_ENDPOINT, RequestBody::Multipart(fields))
            .await?;
        response.json().context("Failed to parse portfolio response")
    }

    /// Remove a portfolio entry
    pub async fn delete_portfolio(&self, id: i64) -> Result<()> {
        self.delete(&format!("{}/{}", PORTFOLIO_ENDPOINT, id)).await
    }
}

// Internal API response types for parsing

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SkillsResponse {
    #[serde(default)]
    skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(rename = "imageUrl")]
    image_url: String,
}
