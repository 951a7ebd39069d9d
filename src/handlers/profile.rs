//! Magic-link redemption and profile re-scoping.
//!
//! Both flows answer with redirects rather than JSON: they are navigated
//! to by the browser, not called by frontend code. Failures redirect to
//! the landing page with a reason code the UI can render.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Duration;

use crate::dtos::{RedeemLinkQuery, SwitchProfileQuery};
use crate::error::AppError;
use crate::services::{AuthzError, VerifyError, SESSION_COOKIE};
use crate::AppState;

use super::found;

/// Redeem a magic-link secret for a profile-scoped session.
///
/// GET /auth/link?token=...&profile_id=...
#[tracing::instrument(skip(state, jar, query))]
pub async fn redeem_link(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<RedeemLinkQuery>,
) -> Result<Response, AppError> {
    let (token, profile_id) = match (query.token, query.profile_id) {
        (Some(token), Some(profile_id)) => (token, profile_id),
        _ => return Ok(login_fail(&state, "invalid_link")),
    };

    let verified = match state.one_time.redeem_link(&token).await {
        Ok(verified) => verified,
        Err(VerifyError::Expired) => return Ok(login_fail(&state, "expired")),
        Err(VerifyError::NotRequested | VerifyError::InvalidCode | VerifyError::RateLimited) => {
            return Ok(login_fail(&state, "invalid_link"));
        }
        Err(e @ VerifyError::Store(_)) => return Err(e.into()),
    };

    let ttl = Duration::minutes(state.config.token.session_ttl_minutes);
    let session_token = match state
        .guard
        .scope_verified_email(&verified.email, profile_id, ttl)
        .await
    {
        Ok(token) => token,
        Err(AuthzError::Forbidden(_)) => return Ok(login_fail(&state, "forbidden")),
        Err(AuthzError::Unauthorized(_)) => return Ok(login_fail(&state, "invalid_link")),
        Err(e) => return Err(e.into()),
    };

    let jar = jar.add(state.cookies.bind(&session_token, ttl));
    let target = format!("{}/provider/{}/edit", state.config.base_url, profile_id);
    Ok((jar, found(&target)).into_response())
}

/// Re-scope the current session to one owned profile, replacing the
/// cookie.
///
/// GET /auth/switch?profile_id=...
#[tracing::instrument(skip(state, jar, query))]
pub async fn switch_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SwitchProfileQuery>,
) -> Result<Response, AppError> {
    let Some(profile_id) = query.profile_id else {
        return Ok(found(&format!("{}/", state.config.base_url)));
    };

    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(login_required(&state));
    };
    let current_token = cookie.value().to_string();

    let ttl = Duration::minutes(state.config.token.session_ttl_minutes);
    let new_token = match state
        .guard
        .switch_profile(&current_token, profile_id, ttl)
        .await
    {
        Ok(token) => token,
        Err(AuthzError::Unauthorized(_)) => return Ok(login_required(&state)),
        Err(AuthzError::Forbidden(_)) => {
            return Ok(found(&format!(
                "{}/?login=forbidden",
                state.config.base_url
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let jar = jar.add(state.cookies.bind(&new_token, ttl));
    let target = format!("{}/provider/{}/edit", state.config.base_url, profile_id);
    Ok((jar, found(&target)).into_response())
}

fn login_required(state: &AppState) -> Response {
    found(&format!("{}/?login=required", state.config.base_url))
}

fn login_fail(state: &AppState, reason: &str) -> Response {
    found(&format!(
        "{}/?login=fail&reason={}",
        state.config.base_url,
        urlencoding::encode(reason)
    ))
}
