//! Services layer: the authentication core proper.
//!
//! Each service takes its collaborators (store, clock, notifier) as
//! injected capabilities constructed once at startup.

mod authz;
mod clock;
mod email;
pub mod error;
mod one_time;
mod session;
mod token;

pub use authz::AuthorizationGuard;
pub use clock::{Clock, ManualClock, SystemClock};
pub use email::{FailingNotifier, MockNotifier, Notifier, SentMail, SmtpNotifier};
pub use error::{AuthzError, ForbiddenReason, IssueError, TokenError, VerifyError};
pub use one_time::{OneTimeCredentialService, Verified};
pub use session::{SessionCookies, SESSION_COOKIE};
pub use token::{Claims, Scope, TokenService};
