use serde::{Deserialize, Serialize};

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Request body for login. Fields default to empty so missing credentials
/// surface as a domain error instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Partial profile update; only supplied fields are touched.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SendResetRequest {
    #[serde(default)]
    pub email: String,
}

/// Request body for consuming a reset link.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub uid: String,
    pub token: String,
    pub new_password: String,
}

/// The subset of an account that is safe to return to its owner.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub avatar_url: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success_msg: &'static str,
}
