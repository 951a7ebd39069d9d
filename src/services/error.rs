//! Domain error enums for the authentication services.

use thiserror::Error;

use crate::error::AppError;
use crate::store::StoreError;

/// Failures when issuing a one-time credential.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("invalid email address")]
    InvalidInput,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures when verifying a one-time credential.
#[derive(Debug, Error, PartialEq)]
pub enum VerifyError {
    /// No outstanding credential for this email.
    #[error("code was not requested")]
    NotRequested,

    /// The credential's validity window has elapsed; the row is gone.
    #[error("code has expired")]
    Expired,

    /// The attempt budget is spent.
    #[error("too many attempts")]
    RateLimited,

    /// The submitted secret did not match.
    #[error("invalid code")]
    InvalidCode,

    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for VerifyError {
    fn from(err: StoreError) -> Self {
        VerifyError::Store(err.to_string())
    }
}

/// Failures when verifying a capability token. Both fail closed; the
/// distinction lets callers say "session expired, log in again" instead of
/// a hard failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature invalid")]
    SignatureInvalid,

    #[error("token expired")]
    TokenExpired,
}

/// Why the authorization guard refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// Token is scoped to a different profile.
    ScopeMismatch,
    /// Email-only token; profile selection has not happened yet.
    SelectionRequired,
    /// The target's ownership anchor does not match the token email.
    NotOwner,
}

impl ForbiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForbiddenReason::ScopeMismatch => "scope_mismatch",
            ForbiddenReason::SelectionRequired => "selection_required",
            ForbiddenReason::NotOwner => "not_owner",
        }
    }
}

/// Failures from the authorization guard and re-scoping flow.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The token itself did not verify: not logged in.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] TokenError),

    /// The token verified but may not touch the target.
    #[error("forbidden: {}", .0.as_str())]
    Forbidden(ForbiddenReason),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<IssueError> for AppError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::InvalidInput => {
                AppError::BadRequest(anyhow::anyhow!("invalid email address"))
            }
            IssueError::Store(e) => e.into(),
        }
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::NotRequested => {
                AppError::BadRequest(anyhow::anyhow!("code was not requested"))
            }
            VerifyError::Expired => AppError::BadRequest(anyhow::anyhow!("code has expired")),
            VerifyError::RateLimited => {
                AppError::TooManyRequests("too many attempts".to_string(), None)
            }
            VerifyError::InvalidCode => AppError::BadRequest(anyhow::anyhow!("invalid code")),
            VerifyError::Store(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::SignatureInvalid => {
                AppError::Unauthorized(anyhow::anyhow!("token signature invalid"))
            }
            TokenError::TokenExpired => AppError::Unauthorized(anyhow::anyhow!("token expired")),
        }
    }
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthorized(e) => e.into(),
            AuthzError::Forbidden(reason) => {
                AppError::Forbidden(anyhow::anyhow!("{}", reason.as_str()))
            }
            AuthzError::Store(e) => e.into(),
            AuthzError::Internal(e) => AppError::InternalError(e),
        }
    }
}
