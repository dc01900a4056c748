use ticbot_core::{Mailbox, SecretSource};

use crate::gmail_mailbox::{GmailMailbox, GmailMailboxConfig};
use crate::mail_error::MailError;

/// Provider-neutral inbox settings, as read from configuration.
#[derive(Debug, Clone)]
pub struct MailboxSettings {
    pub kind: String,
    pub user: String,
    pub secret: SecretSource,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub folder: Option<String>,
}

pub type MailboxConstructor = fn(&MailboxSettings) -> Result<Box<dyn Mailbox>, MailError>;

/// Mailbox types selectable with `type:` in the inbox block.
pub const MAILBOX_TYPES: &[(&str, MailboxConstructor)] = &[("gmail", build_gmail_mailbox)];

pub fn registered_mailbox_types() -> impl Iterator<Item = &'static str> {
    MAILBOX_TYPES.iter().map(|(name, _)| *name)
}

pub fn build_mailbox(settings: &MailboxSettings) -> Result<Box<dyn Mailbox>, MailError> {
    let kind = settings.kind.trim();
    let (_, constructor) = MAILBOX_TYPES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(kind))
        .ok_or_else(|| {
            MailError::InvalidConfig(format!(
                "unknown mailbox type '{kind}' (known: {})",
                registered_mailbox_types().collect::<Vec<_>>().join(", ")
            ))
        })?;
    constructor(settings)
}

fn build_gmail_mailbox(settings: &MailboxSettings) -> Result<Box<dyn Mailbox>, MailError> {
    let mut config = GmailMailboxConfig::new(settings.user.clone(), settings.secret.clone());
    if let Some(host) = settings.host.as_ref() {
        config.host = host.clone();
    }
    if let Some(port) = settings.port {
        config.port = port;
    }
    if let Some(folder) = settings.folder.as_ref() {
        config.folder = folder.clone();
    }
    Ok(Box::new(GmailMailbox::new(config)?))
}

#[cfg(test)]
mod tests {
    use ticbot_core::SecretSource;

    use super::{build_mailbox, registered_mailbox_types, MailboxSettings};
    use crate::mail_error::MailError;

    fn settings(kind: &str) -> MailboxSettings {
        MailboxSettings {
            kind: kind.to_string(),
            user: "help@example.org".to_string(),
            secret: SecretSource::env("INBOX_PASSWORD"),
            host: None,
            port: Some(1993),
            folder: None,
        }
    }

    #[test]
    fn unit_gmail_is_registered() {
        assert_eq!(registered_mailbox_types().collect::<Vec<_>>(), vec!["gmail"]);
        let mailbox = build_mailbox(&settings("GMail")).expect("mailbox");
        assert_eq!(mailbox.own_address(), "help@example.org");
        assert_eq!(mailbox.secret_name(), "INBOX_PASSWORD");
    }

    #[test]
    fn regression_unknown_mailbox_type_fails_at_construction() {
        let error = build_mailbox(&settings("outlook")).err().expect("unknown type");
        assert!(matches!(
            error,
            MailError::InvalidConfig(ref message) if message.contains("outlook")
        ));
    }
}
