//! Gmail inbox over IMAPS.

use std::collections::HashMap;
use std::net::TcpStream;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use native_tls::{TlsConnector, TlsStream};
use ticbot_core::{AuthorizationCheck, Mailbox, Message, SecretSource};

use crate::gmail_fetch_parser::GmailFetchParser;
use crate::mail_error::MailError;
use crate::mime_message::parse_rfc822;

pub const DEFAULT_GMAIL_IMAP_HOST: &str = "imap.gmail.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_IMAP_FOLDER: &str = "INBOX";

type ImapSession = imap::Session<TlsStream<TcpStream>>;

#[derive(Debug, Clone)]
/// Public struct `GmailMailboxConfig` used across ticbot components.
pub struct GmailMailboxConfig {
    pub user: String,
    pub secret: SecretSource,
    pub host: String,
    pub port: u16,
    pub folder: String,
}

impl GmailMailboxConfig {
    pub fn new(user: impl Into<String>, secret: SecretSource) -> Self {
        Self {
            user: user.into(),
            secret,
            host: DEFAULT_GMAIL_IMAP_HOST.to_string(),
            port: DEFAULT_IMAP_PORT,
            folder: DEFAULT_IMAP_FOLDER.to_string(),
        }
    }
}

/// Shared inbox identified by Gmail's stable `X-GM-MSGID`.
pub struct GmailMailbox {
    config: GmailMailboxConfig,
    parser: GmailFetchParser,
}

impl GmailMailbox {
    pub fn new(config: GmailMailboxConfig) -> Result<Self, MailError> {
        if config.user.trim().is_empty() {
            return Err(MailError::InvalidConfig(
                "mailbox user must not be empty".to_string(),
            ));
        }
        let parser = GmailFetchParser::new()
            .map_err(|error| MailError::InvalidConfig(format!("fetch parser: {error}")))?;
        Ok(Self { config, parser })
    }

    fn connect(&self) -> Result<ImapSession, MailError> {
        let password = self
            .config
            .secret
            .resolve()
            .ok_or_else(|| MailError::MissingSecret(self.config.secret.name().to_string()))?;
        let tls = TlsConnector::builder().build()?;
        tracing::debug!(host = %self.config.host, port = self.config.port, "connecting to imap");
        let client = imap::connect(
            (self.config.host.as_str(), self.config.port),
            &self.config.host,
            &tls,
        )
        .map_err(|error| MailError::imap("connect", error))?;
        client
            .login(&self.config.user, &password)
            .map_err(|(error, _client)| match error {
                imap::Error::No(reason) | imap::Error::Bad(reason) => MailError::LoginRejected {
                    user: self.config.user.clone(),
                    reason,
                },
                other => MailError::imap("login", other),
            })
    }

    fn fetch_since(
        &self,
        session: &mut ImapSession,
        since: DateTime<Utc>,
    ) -> Result<Vec<Message>, MailError> {
        session
            .select(&self.config.folder)
            .map_err(|error| MailError::imap("select", error))?;

        let mut uids = session
            .uid_search(since_query(since))
            .map_err(|error| MailError::imap("uid search", error))?
            .into_iter()
            .collect::<Vec<u32>>();
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        uids.sort_unstable();
        let uid_set = uids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let raw_meta = session
            .run_command_and_read_response(format!(
                "UID FETCH {uid_set} (UID X-GM-MSGID X-GM-LABELS)"
            ))
            .map_err(|error| MailError::imap("fetch gmail attributes", error))?;
        let meta_by_uid = self
            .parser
            .parse_response(&String::from_utf8_lossy(&raw_meta))
            .into_iter()
            .map(|meta| (meta.uid, meta))
            .collect::<HashMap<_, _>>();

        let fetched = session
            .uid_fetch(&uid_set, "RFC822")
            .map_err(|error| MailError::imap("fetch messages", error))?;
        let mut bodies = HashMap::new();
        for fetch in fetched.iter() {
            if let (Some(uid), Some(body)) = (fetch.uid, fetch.body()) {
                bodies.insert(uid, body.to_vec());
            }
        }

        let mut messages = Vec::new();
        for uid in uids {
            let (Some(meta), Some(body)) = (meta_by_uid.get(&uid), bodies.get(&uid)) else {
                tracing::warn!(uid, "skipping message without gmail id or body");
                continue;
            };
            match parse_rfc822(&meta.message_id, body, meta.labels.clone()) {
                Ok(message) if message.date() >= since => messages.push(message),
                Ok(_) => {}
                Err(error) => tracing::warn!(uid, %error, "skipping unparseable message"),
            }
        }
        tracing::debug!(count = messages.len(), "fetched recent messages");
        Ok(messages)
    }
}

/// IMAP `SINCE` compares calendar dates in the server's timezone, so the
/// search starts a day early and the exact cut happens after parsing.
fn since_query(since: DateTime<Utc>) -> String {
    let day_before = since - Duration::days(1);
    format!("SINCE {}", day_before.format("%d-%b-%Y"))
}

fn close_session(mut session: ImapSession) {
    if let Err(error) = session.logout() {
        tracing::debug!(%error, "imap logout failed");
    }
}

impl AuthorizationCheck for GmailMailbox {
    type Error = MailError;

    fn check_authorization(&self) -> Result<bool, Self::Error> {
        close_session(self.connect()?);
        Ok(true)
    }

    fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str> {
        match error {
            MailError::MissingSecret(_) => Some("MissingSecret"),
            MailError::LoginRejected { .. } => Some("LoginRejected"),
            _ => None,
        }
    }
}

impl Mailbox for GmailMailbox {
    fn own_address(&self) -> &str {
        &self.config.user
    }

    fn secret_name(&self) -> &str {
        self.config.secret.name()
    }

    fn fetch_recent_messages(&self, since: DateTime<Utc>) -> Result<Vec<Message>> {
        let mut session = self.connect()?;
        let fetched = self.fetch_since(&mut session, since);
        close_session(session);
        Ok(fetched?)
    }
}
