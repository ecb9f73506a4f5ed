use serde::{Deserialize, Serialize};

use super::UserRole;

/// Full profile record from `GET /api/v1/users/me`: the identity plus the
/// fields shown on the profile tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub nickname: String,
    #[serde(rename = "userRole")]
    pub user_role: UserRole,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
}

/// Partial update for `PUT /api/v1/users/profiles`. Unset fields are omitted
/// from the request body and left untouched by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "userRole", skip_serializing_if = "Option::is_none")]
    pub user_role: Option<UserRole>,
}
