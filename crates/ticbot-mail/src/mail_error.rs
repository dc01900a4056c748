use thiserror::Error;

/// Failures of the IMAP mailbox and the SMTP channel.
///
/// Provider errors are flattened to text at the boundary so the enum stays
/// `Send + Sync` regardless of the transport's stream types.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("no mail secret available from '{0}'")]
    MissingSecret(String),
    #[error("mail server rejected the login for {user}: {reason}")]
    LoginRejected { user: String, reason: String },
    #[error("imap {operation} failed: {message}")]
    Imap { operation: String, message: String },
    #[error("tls setup failed: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("smtp server rejected the credentials: {0}")]
    SmtpRejected(#[source] lettre::transport::smtp::Error),
    #[error("smtp transport failed: {0}")]
    Smtp(#[source] lettre::transport::smtp::Error),
    #[error("invalid mail configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build outgoing message: {0}")]
    Build(String),
    #[error("failed to parse message {uid}: {message}")]
    Parse { uid: String, message: String },
}

impl MailError {
    pub(crate) fn imap(operation: &str, error: impl std::fmt::Display) -> Self {
        Self::Imap {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }

    pub(crate) fn from_smtp(error: lettre::transport::smtp::Error) -> Self {
        if error.is_permanent() {
            Self::SmtpRejected(error)
        } else {
            Self::Smtp(error)
        }
    }
}
