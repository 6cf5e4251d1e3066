use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SmtpConfig;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email credentials are not configured")]
    NotConfigured,
    #[error("invalid address '{0}'")]
    Address(String),
    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("{0}")]
    Rejected(String),
}

/// Delivers rendered documents. Object-safe so the state can hold any sender.
pub trait Mailer: Send + Sync {
    fn is_configured(&self) -> bool;

    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, Result<(), MailError>>;
}

/// Build the mailer the configuration asks for.
pub fn from_config(cfg: &SmtpConfig) -> Result<Arc<dyn Mailer>, MailError> {
    if !cfg.is_configured() {
        warn!("SMTP credentials not configured; document delivery will fail");
        return Ok(Arc::new(DisabledMailer));
    }
    Ok(Arc::new(SmtpMailer::new(cfg)?))
}

/// STARTTLS relay with username/password credentials.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, MailError> {
        let from = cfg
            .from
            .parse::<Mailbox>()
            .map_err(|_| MailError::Address(cfg.from.clone()))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .port(cfg.port)
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        info!("SMTP mailer ready ({}:{})", cfg.host, cfg.port);
        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn is_configured(&self) -> bool {
        true
    }

    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            let to = email
                .to
                .parse::<Mailbox>()
                .map_err(|_| MailError::Address(email.to.clone()))?;
            let message = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(email.subject)
                .header(ContentType::TEXT_HTML)
                .body(email.html)?;

            let response = self.transport.send(message).await?;
            if !response.is_positive() {
                return Err(MailError::Rejected(format!(
                    "server answered {}",
                    response.code()
                )));
            }
            info!("Email sent to {}", email.to);
            Ok(())
        })
    }
}

/// Used when no SMTP credentials are configured: every send fails.
pub struct DisabledMailer;

impl Mailer for DisabledMailer {
    fn is_configured(&self) -> bool {
        false
    }

    fn send(&self, _email: OutgoingEmail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async { Err(MailError::NotConfigured) })
    }
}

/// Keeps messages in memory instead of delivering them.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_with: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send is rejected with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for RecordingMailer {
    fn is_configured(&self) -> bool {
        self.fail_with.is_none()
    }

    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, Result<(), MailError>> {
        Box::pin(async move {
            if let Some(reason) = &self.fail_with {
                return Err(MailError::Rejected(reason.clone()));
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(email);
            }
            Ok(())
        })
    }
}
