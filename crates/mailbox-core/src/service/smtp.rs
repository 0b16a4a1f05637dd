//! SMTP service for sending emails.
//!
//! Submits messages to a relay and reports the identifier the relay assigned.

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::email::{EmailRecord, SendEmailApi};
use crate::{Error, Result};

/// Security/encryption mode for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

/// SMTP relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port; 0 selects the default for the security mode.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Username for authentication; empty disables authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
    /// Domain used in generated Message-ID headers; defaults to the host.
    pub message_id_domain: String,
}

impl SmtpConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        match security {
            Security::None => 25,
            Security::StartTls => 587,
            Security::Tls => 465,
        }
    }

    /// Configured port, or the default for the security mode.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        if self.port == 0 {
            Self::default_port(self.security)
        } else {
            self.port
        }
    }
}

/// Sends email through an SMTP relay.
pub struct SmtpTransmitter {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    message_id_domain: String,
}

impl SmtpTransmitter {
    /// Creates a transmitter for the configured relay.
    ///
    /// No connection is made until the first message is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is missing or the relay cannot be
    /// configured.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        if config.host.is_empty() {
            return Err(Error::Config("SMTP host is required".into()));
        }

        let builder = match config.security {
            Security::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
            Security::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            }
            Security::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &config.host,
            )),
        }
        .map_err(|e| Error::Config(format!("SMTP relay {}: {e}", config.host)))?;

        let mut builder = builder.port(config.effective_port());
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let message_id_domain = if config.message_id_domain.is_empty() {
            config.host.clone()
        } else {
            config.message_id_domain.clone()
        };

        Ok(Self {
            mailer: builder.build(),
            message_id_domain,
        })
    }
}

impl SendEmailApi for SmtpTransmitter {
    async fn send_email(&self, email: &EmailRecord) -> Result<String> {
        let message_id = format!("<{}@{}>", Uuid::new_v4().simple(), self.message_id_domain);
        let message = build_message(email, &message_id)?;

        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| Error::SendFailed(e.to_string()))?;

        let sent_id = queued_id(response.message())
            .unwrap_or_else(|| message_id.trim_matches(['<', '>']).to_owned());
        info!(draft_id = %email.message_id(), sent_id = %sent_id, "Email accepted by relay");
        Ok(sent_id)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| Error::SendFailed(format!("invalid address {address:?}: {e}")))
}

/// Builds the RFC 5322 message for an email record.
fn build_message(email: &EmailRecord, message_id: &str) -> Result<Message> {
    let mut builder = Message::builder()
        .message_id(Some(message_id.to_owned()))
        .subject(email.subject.clone());

    for addr in &email.from {
        builder = builder.from(parse_mailbox(addr)?);
    }
    for addr in &email.reply_to {
        builder = builder.reply_to(parse_mailbox(addr)?);
    }
    for addr in &email.to {
        builder = builder.to(parse_mailbox(addr)?);
    }
    for addr in &email.cc {
        builder = builder.cc(parse_mailbox(addr)?);
    }
    for addr in &email.bcc {
        builder = builder.bcc(parse_mailbox(addr)?);
    }

    let message = if email.html.is_empty() {
        builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.text.clone())
    } else {
        builder.multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))
    };

    message.map_err(|e| Error::SendFailed(e.to_string()))
}

/// Extracts the queue id from a `250 ... queued as <id>` reply.
fn queued_id<'a>(lines: impl IntoIterator<Item = &'a str>) -> Option<String> {
    const MARKER: &str = "queued as ";

    lines.into_iter().find_map(|line| {
        let start = line.to_ascii_lowercase().find(MARKER)? + MARKER.len();
        line[start..]
            .split_whitespace()
            .next()
            .map(|id| id.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_owned())
            .filter(|id| !id.is_empty())
    })
}
