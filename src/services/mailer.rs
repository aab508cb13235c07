use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{AppConfig, MailConfig};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("No recipient configured: DEV_EMAIL must be set outside production")]
    NoRecipient,
    #[error("Failed to build message: {0}")]
    Build(String),
    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// One HTML mail ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError>;
}

/// Where mail for `requested` actually goes: the real address in production, `DEV_EMAIL` elsewhere
pub fn resolve_receiver(config: &AppConfig, requested: &str) -> Result<String, MailError> {
    if config.is_production() {
        return Ok(requested.to_string());
    }
    config.mail.dev_email.clone().ok_or(MailError::NoRecipient)
}

pub fn password_reset_body(link: &str) -> String {
    format!(
        "<p>Click the link below to reset your password.</p>\
         <p><a href=\"{link}\" style=\"color: #3f86ff; text-decoration: none;\">{link}</a></p>\
         <p>If the link doesn't work, copy and paste the link into your browser.</p>",
        link = link
    )
}

pub const PASSWORD_RESET_SUBJECT: &str = "Password Reset Request";

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let from = Mailbox::new(
            Some(config.from_name.clone()),
            config
                .from_address
                .parse()
                .map_err(|_| MailError::InvalidAddress(config.from_address.clone()))?,
        );

        let mut builder = match config.host.as_str() {
            "localhost" | "127.0.0.1" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
            host if config.port == 465 => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(|e| MailError::Transport(e.to_string()))?
            }
            host => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
        }
        .port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self { transport: builder.build(), from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError> {
        let to: Mailbox = mail.to.parse().map_err(|_| MailError::InvalidAddress(mail.to.clone()))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(message).await.map_err(|e| MailError::Transport(e.to_string()))?;
        tracing::info!("Mail sent to {}", mail.to);
        Ok(())
    }
}

/// Keeps every mail in memory instead of sending it
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutboundMail>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutboundMail) -> Result<(), MailError> {
        if mail.to.parse::<Mailbox>().is_err() {
            return Err(MailError::InvalidAddress(mail.to));
        }
        tracing::debug!("Recorded mail to {}", mail.to);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail);
        }
        Ok(())
    }
}
