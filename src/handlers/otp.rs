//! OTP request and magic-link verification handlers.

use axum::{http::StatusCode, Json};
use axum::extract::State;

use crate::dtos::{LinkTokenResponse, OkResponse, RequestOtpRequest, VerifyOtpRequest};
use crate::error::AppError;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Request a one-time code.
///
/// POST /auth/otp/request
#[tracing::instrument(skip(state, req))]
pub async fn request_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RequestOtpRequest>,
) -> Result<(StatusCode, Json<OkResponse>), AppError> {
    state.one_time.request_code(&req.email).await?;
    Ok((StatusCode::OK, Json(OkResponse { ok: true })))
}

/// Verify a one-time code and hand back a single-use link secret — the
/// magic-link flow. The code-entry flow lives in `session::login`.
///
/// POST /auth/otp/verify
#[tracing::instrument(skip(state, req))]
pub async fn verify_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyOtpRequest>,
) -> Result<(StatusCode, Json<LinkTokenResponse>), AppError> {
    let verified = state.one_time.verify_code(&req.email, &req.code).await?;
    let token = state.one_time.issue_link(&verified.email).await?;
    Ok((StatusCode::OK, Json(LinkTokenResponse { token })))
}
