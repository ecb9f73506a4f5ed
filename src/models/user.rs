use serde::{Deserialize, Serialize};

/// Marketplace account role. Drives which views and operations a logged-in
/// user sees; the backend encodes it as a `ROLE_*` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "ROLE_CLIENT")]
    Client,
    #[serde(rename = "ROLE_FREELANCER")]
    Freelancer,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Client => write!(f, "Client"),
            UserRole::Freelancer => write!(f, "Freelancer"),
        }
    }
}

/// Authenticated identity as returned by `GET /api/v1/user/me` and embedded
/// in some login responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub nickname: String,
    #[serde(rename = "userRole")]
    pub user_role: UserRole,
}

/// Registration payload for `POST /api/v1/auth/signup`.
#[derive(Debug, Clone, Serialize)]
pub struct Signup {
    pub email: String,
    pub password: String,
    pub nickname: String,
    #[serde(rename = "userRole")]
    pub user_role: UserRole,
}
