//! Alert delivery over SMTP.

use crate::domain::AlertEmail;
use crate::error::NotifyError;
use crate::infra::config::{AppConfig, EmailConfig};
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers rendered alert emails.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send(&self, to: &str, email: &AlertEmail) -> Result<(), NotifyError>;

    /// `false` when alerts are switched off and `send` would only fail.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Stand-in used when no SMTP server is configured.
pub struct DisabledNotifier;

#[async_trait]
impl AlertNotifier for DisabledNotifier {
    async fn send(&self, _to: &str, _email: &AlertEmail) -> Result<(), NotifyError> {
        Err(NotifyError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
    port: u16,
}

fn parse_address(address: &str) -> Result<Address, NotifyError> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let from = Mailbox::new(Some(config.from_name.clone()), parse_address(&config.from)?);

        let builder = if config.implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.password.clone()))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from,
            host: config.host.clone(),
            port: config.port,
        })
    }

    /// Multipart (plain + HTML) message with `Reply-To` set to the sender.
    pub fn build_message(&self, to: &str, email: &AlertEmail) -> Result<Message, NotifyError> {
        let recipient = Mailbox::new(None, parse_address(to)?);
        Message::builder()
            .from(self.from.clone())
            .reply_to(Mailbox::new(None, self.from.email.clone()))
            .to(recipient)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text_body.clone(),
                email.html_body.clone(),
            ))
            .map_err(|e| NotifyError::Message(e.to_string()))
    }

    /// Connects and authenticates without sending anything.
    pub async fn test_connection(&self) -> Result<bool, NotifyError> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl AlertNotifier for SmtpMailer {
    async fn send(&self, to: &str, email: &AlertEmail) -> Result<(), NotifyError> {
        let message = self.build_message(to, email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        tracing::info!(to = %to, subject = %email.subject, "alert email sent");
        Ok(())
    }
}

/// SMTP when configured, otherwise the disabled stand-in.
pub fn notifier_from_config(config: &AppConfig) -> Result<Arc<dyn AlertNotifier>, NotifyError> {
    match &config.email {
        Some(email) => Ok(Arc::new(SmtpMailer::new(email)?)),
        None => {
            tracing::warn!("EMAIL_HOST/EMAIL_PASSWORD not set, alert emails are disabled");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}
