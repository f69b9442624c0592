// ============================
// greenpoll-backend-lib/src/notifier.rs
// ============================

//! Outbound email.
//!
//! Sending is fire-and-forget: a mail failure is logged but never fails
//! the request that triggered it, so registration and password reset
//! requests succeed even when the relay is down.
use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use tracing::{info, warn};

use crate::config::SmtpSettings;

/// The emails this service sends.
#[derive(Debug, Clone)]
pub enum EmailTemplate {
    VerifyAccount { app_url: String, verify_id: String },
    PasswordReset { app_url: String, reset_id: String },
}

impl EmailTemplate {
    pub fn subject(&self) -> &'static str {
        match self {
            EmailTemplate::VerifyAccount { .. } => "GreenPoll - Verify Account",
            EmailTemplate::PasswordReset { .. } => "GreenPoll - Password Reset",
        }
    }

    pub fn body(&self) -> String {
        match self {
            EmailTemplate::VerifyAccount { app_url, verify_id } => format!(
                "Welcome to GreenPoll!\n\n\
                 Please verify your account by clicking the link below. \
                 The link expires in one hour, and unverified accounts \
                 are removed when it does.\n\n\
                 {app_url}/verify?verify_id={verify_id}\n"
            ),
            EmailTemplate::PasswordReset { app_url, reset_id } => format!(
                "A password reset was requested for your GreenPoll \
                 account.\n\n\
                 Click the link below to choose a new password. The link \
                 expires in one hour. If you did not request this, you \
                 can ignore this email.\n\n\
                 {app_url}/reset_password?reset_id={reset_id}\n"
            ),
        }
    }
}

/// Delivers account emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends an email. Never returns an error; failures are logged.
    async fn send(&self, to: &str, template: EmailTemplate);
}

/// SMTP-backed notifier.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: String,
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings) -> anyhow::Result<Self> {
        let transport = SmtpTransport::relay(&settings.host)?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(Self {
            transport,
            from: settings.from.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, to: &str, template: EmailTemplate) {
        let message = Message::builder()
            .from(match self.from.parse() {
                Ok(from) => from,
                Err(e) => {
                    warn!(error = %e, "invalid sender address, dropping email");
                    return;
                },
            })
            .to(match to.parse() {
                Ok(to) => to,
                Err(e) => {
                    warn!(error = %e, "invalid recipient address, dropping email");
                    return;
                },
            })
            .subject(template.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(template.body());

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "failed to build email");
                return;
            },
        };

        // lettre's SmtpTransport is blocking
        let transport = self.transport.clone();
        let result =
            tokio::task::spawn_blocking(move || transport.send(&message)).await;
        match result {
            Ok(Ok(_)) => info!(to, subject = template.subject(), "email sent"),
            Ok(Err(e)) => warn!(to, error = %e, "failed to send email"),
            Err(e) => warn!(to, error = %e, "email send task panicked"),
        }
    }
}

/// Notifier used when no SMTP transport is configured; logs instead of
/// sending.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, to: &str, template: EmailTemplate) {
        info!(to, subject = template.subject(), "email suppressed (no SMTP configured)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_carry_token_links() {
        let verify = EmailTemplate::VerifyAccount {
            app_url: "https://greenpoll.example.com".to_string(),
            verify_id: "abc123".to_string(),
        };
        assert_eq!(verify.subject(), "GreenPoll - Verify Account");
        assert!(verify
            .body()
            .contains("https://greenpoll.example.com/verify?verify_id=abc123"));

        let reset = EmailTemplate::PasswordReset {
            app_url: "https://greenpoll.example.com".to_string(),
            reset_id: "xyz789".to_string(),
        };
        assert_eq!(reset.subject(), "GreenPoll - Password Reset");
        assert!(reset
            .body()
            .contains("https://greenpoll.example.com/reset_password?reset_id=xyz789"));
    }
}
