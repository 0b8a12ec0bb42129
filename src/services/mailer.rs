use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use thiserror::Error;

use crate::config::EmailSettings;

/// Errors that can occur when sending email
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    BuildError(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    SmtpError(#[from] lettre::transport::smtp::Error),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailerError>;
}

/// Plain-text email over SMTP
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_settings(settings: &EmailSettings) -> Result<Self, MailerError> {
        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
        };

        let mut builder = builder
            .port(settings.smtp_port)
            .timeout(Some(Duration::from_secs(settings.timeout_secs)));

        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(&settings.from_address)?,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailerError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailerError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(recipient)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        let response = self.transport.send(message).await?;
        if !response.is_positive() {
            return Err(MailerError::Rejected(format!("{:?}", response.code())));
        }

        tracing::debug!("Sent '{}' to {}", subject, recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(from: &str) -> EmailSettings {
        EmailSettings {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            starttls: false,
            username: None,
            password: None,
            from_address: from.to_string(),
            timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_mailer_from_settings() {
        assert!(SmtpMailer::from_settings(&settings("noreply@accessjobs.com")).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_from_address() {
        assert!(matches!(
            SmtpMailer::from_settings(&settings("not an address")),
            Err(MailerError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected_before_sending() {
        let mailer = SmtpMailer::from_settings(&settings("noreply@accessjobs.com")).unwrap();
        let result = mailer.send("nobody", "subject", "body").await;
        assert!(matches!(result, Err(MailerError::InvalidAddress { .. })));
    }
}
