//! Code-entry login, session introspection, and logout.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Duration;

use crate::dtos::{LoginResponse, OkResponse, VerifyOtpRequest};
use crate::error::AppError;
use crate::middleware::SessionClaims;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Verify a one-time code and start an email-scoped session — the
/// code-entry flow. The profile is not chosen yet, so the token carries
/// only the email; the frontend follows `redirect` to the selection page.
///
/// POST /auth/login
#[tracing::instrument(skip(state, jar, req))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let verified = state.one_time.verify_code(&req.email, &req.code).await?;

    let ttl = if req.remember {
        Duration::days(state.config.token.long_session_ttl_days)
    } else {
        Duration::minutes(state.config.token.session_ttl_minutes)
    };

    let token = state
        .tokens
        .mint_email_scoped(&verified.email, ttl)
        .map_err(AppError::InternalError)?;

    tracing::info!(email = %verified.email, "Email verified, session started");

    let jar = jar.add(state.cookies.bind(&token, ttl));
    Ok((
        jar,
        (
            StatusCode::OK,
            Json(LoginResponse {
                ok: true,
                redirect: "/provider/select".to_string(),
            }),
        ),
    ))
}

/// Describe the current session's scope.
///
/// GET /auth/session (behind the session middleware)
pub async fn introspect(SessionClaims(claims): SessionClaims) -> impl IntoResponse {
    Json(claims.scope)
}

/// Clear the session cookie. Works the same on GET and POST, with or
/// without an existing session.
///
/// GET|POST /auth/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(state.cookies.clear());
    (jar, (StatusCode::OK, Json(OkResponse { ok: true })))
}
