use anyhow::Result;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::Mailbox as Address;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message as Email, SmtpTransport, Transport};
use ticbot_core::{AuthorizationCheck, OutgoingMail, OutgoingReply, SecretSource};

use crate::mail_error::MailError;

pub const DEFAULT_SMTP_PORT: u16 = 465;
const IMPLICIT_TLS_PORT: u16 = 465;

/// `Thread-Topic` as set by Outlook; lettre has no typed header for it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ThreadTopic(String);

impl Header for ThreadTopic {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Thread-Topic")
    }

    fn parse(s: &str) -> std::result::Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

#[derive(Debug, Clone)]
/// Public struct `SmtpChannelConfig` used across ticbot components.
pub struct SmtpChannelConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub secret: SecretSource,
}

/// Sends replies as the bot account.
pub struct SmtpChannel {
    config: SmtpChannelConfig,
}

impl SmtpChannel {
    pub fn new(config: SmtpChannelConfig) -> Result<Self, MailError> {
        if config.host.trim().is_empty() || config.user.trim().is_empty() {
            return Err(MailError::InvalidConfig(
                "smtp host and user must not be empty".to_string(),
            ));
        }
        Ok(Self { config })
    }

    fn transport(&self) -> Result<SmtpTransport, MailError> {
        let password = self
            .config
            .secret
            .resolve()
            .ok_or_else(|| MailError::MissingSecret(self.config.secret.name().to_string()))?;
        let credentials = Credentials::new(self.config.user.clone(), password);
        let builder = if self.config.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&self.config.host)
        } else {
            SmtpTransport::starttls_relay(&self.config.host)
        }
        .map_err(MailError::from_smtp)?;
        Ok(builder
            .port(self.config.port)
            .credentials(credentials)
            .build())
    }

    /// Builds the wire message; `recipients` overrides `reply.to` when given.
    pub fn build_email(
        &self,
        reply: &OutgoingReply,
        recipients: &[String],
    ) -> Result<Email, MailError> {
        let parse_address = |raw: &str| {
            raw.parse::<Address>()
                .map_err(|error| MailError::Build(format!("invalid address '{raw}': {error}")))
        };
        let recipients = if recipients.is_empty() {
            reply.to.as_slice()
        } else {
            recipients
        };
        if recipients.is_empty() {
            return Err(MailError::Build("reply has no recipients".to_string()));
        }

        let mut builder = Email::builder()
            .from(parse_address(&reply.from)?)
            .subject(reply.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for recipient in recipients {
            builder = builder.to(parse_address(recipient)?);
        }
        if let Some(in_reply_to) = reply.in_reply_to.as_deref() {
            builder = builder
                .in_reply_to(in_reply_to.to_string())
                .references(in_reply_to.to_string());
        }
        if let Some(topic) = reply.thread_topic.as_deref() {
            builder = builder.header(ThreadTopic(topic.to_string()));
        }
        builder
            .body(reply.body.clone())
            .map_err(|error| MailError::Build(error.to_string()))
    }
}

impl AuthorizationCheck for SmtpChannel {
    type Error = MailError;

    fn check_authorization(&self) -> Result<bool, Self::Error> {
        self.transport()?
            .test_connection()
            .map_err(MailError::from_smtp)
    }

    fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str> {
        match error {
            MailError::MissingSecret(_) => Some("MissingSecret"),
            MailError::SmtpRejected(_) => Some("SmtpRejected"),
            _ => None,
        }
    }
}

impl OutgoingMail for SmtpChannel {
    fn own_address(&self) -> &str {
        &self.config.user
    }

    fn secret_name(&self) -> &str {
        self.config.secret.name()
    }

    fn send_reply(&self, reply: &OutgoingReply, recipients: &[String]) -> Result<()> {
        let email = self.build_email(reply, recipients)?;
        let response = self
            .transport()?
            .send(&email)
            .map_err(MailError::from_smtp)?;
        tracing::debug!(code = %response.code(), "smtp accepted reply");
        Ok(())
    }
}
