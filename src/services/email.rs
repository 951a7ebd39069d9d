//! Outbound notification capability.
//!
//! Constructed once at startup and passed explicitly to the services that
//! dispatch mail, so tests can substitute a recording fake. Dispatch runs
//! on the blocking pool; failures are the caller's to log, never to retry.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};

use crate::config::SmtpConfig;
use crate::error::AppError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send the plaintext one-time code to its email.
    async fn send_otp_code(&self, to_email: &str, code: &str) -> Result<(), AppError>;

    /// Send a magic-link email carrying the absolute redeem URL.
    async fn send_magic_link(&self, to_email: &str, link_url: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "SMTP notifier initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::EmailError(e.to_string()),
            )?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // Send on the blocking pool to keep the async runtime free
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_otp_code(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        let html_body = format!(
            r#"<html>
                <body style="font-family: Arial, sans-serif;">
                    <p>Your confirmation code:</p>
                    <div style="font-size: 28px; font-weight: 700; letter-spacing: 4px;">{code}</div>
                    <p style="color: #6c757d; font-size: 12px;">
                        The code is valid for 10 minutes. If you didn't request it, ignore this email.
                    </p>
                </body>
            </html>"#
        );
        let plain_body =
            format!("Your confirmation code: {code}\n\nThe code is valid for 10 minutes.");

        self.send_email(to_email, "Your email confirmation code", &plain_body, &html_body)
            .await
    }

    async fn send_magic_link(&self, to_email: &str, link_url: &str) -> Result<(), AppError> {
        let html_body = format!(
            r#"<html>
                <body style="font-family: Arial, sans-serif;">
                    <p>Click the link below to open your profile for editing:</p>
                    <p><a href="{link_url}">Edit my profile</a></p>
                    <p style="color: #6c757d; font-size: 12px;">
                        The link works once and expires in 30 minutes.
                    </p>
                </body>
            </html>"#
        );
        let plain_body = format!(
            "Open your profile for editing:\n\n{link_url}\n\nThe link works once and expires in 30 minutes."
        );

        self.send_email(to_email, "Sign in to edit your profile", &plain_body, &html_body)
            .await
    }
}

/// A sent message captured by [`MockNotifier`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub body: String,
}

/// Recording fake for tests. Captures the plaintext code or link URL so
/// test flows can complete verification.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentMail>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mock notifier mutex poisoned").clone()
    }

    pub fn last_body(&self) -> Option<String> {
        self.sent
            .lock()
            .expect("mock notifier mutex poisoned")
            .last()
            .map(|m| m.body.clone())
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_otp_code(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .expect("mock notifier mutex poisoned")
            .push(SentMail {
                to: to_email.to_string(),
                body: code.to_string(),
            });
        Ok(())
    }

    async fn send_magic_link(&self, to_email: &str, link_url: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .expect("mock notifier mutex poisoned")
            .push(SentMail {
                to: to_email.to_string(),
                body: link_url.to_string(),
            });
        Ok(())
    }
}

/// Fake that always fails, for exercising the dispatch-failure path.
#[derive(Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_otp_code(&self, _to_email: &str, _code: &str) -> Result<(), AppError> {
        Err(AppError::EmailError("smtp unreachable".to_string()))
    }

    async fn send_magic_link(&self, _to_email: &str, _link_url: &str) -> Result<(), AppError> {
        Err(AppError::EmailError("smtp unreachable".to_string()))
    }
}
