//! Request and response DTOs for the wire surface.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /auth/otp/request`.
#[derive(Debug, Deserialize, Validate)]
pub struct RequestOtpRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Body of `POST /auth/login` (code-entry flow) and
/// `POST /auth/otp/verify` (magic-link flow).
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    /// Code-entry flow only: ask for the long-lived session variant.
    #[serde(default)]
    pub remember: bool,
}

/// Success body of the code-entry login flow.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub ok: bool,
    /// Where the frontend should go next (the profile selection page).
    pub redirect: String,
}

/// Success body of the magic-link flow: the one-time link secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkTokenResponse {
    pub token: String,
}

/// Query of `GET /auth/link`.
#[derive(Debug, Deserialize)]
pub struct RedeemLinkQuery {
    pub token: Option<String>,
    pub profile_id: Option<i64>,
}

/// Query of `GET /auth/switch`.
#[derive(Debug, Deserialize)]
pub struct SwitchProfileQuery {
    pub profile_id: Option<i64>,
}
