//! HTTP surface of the authentication core.

pub mod otp;
pub mod profile;
pub mod session;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// 302 redirect. The frontend relies on Found rather than See Other for
/// these flows.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
