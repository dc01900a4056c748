//! Mail collaborators for ticbot: the Gmail IMAP inbox and the SMTP channel
//! the bot replies through.

mod gmail_fetch_parser;
mod gmail_mailbox;
mod mail_error;
mod mailbox_registry;
mod mime_message;
mod smtp_channel;

pub use gmail_fetch_parser::{GmailFetchMeta, GmailFetchParser};
pub use gmail_mailbox::{
    GmailMailbox, GmailMailboxConfig, DEFAULT_GMAIL_IMAP_HOST, DEFAULT_IMAP_FOLDER,
    DEFAULT_IMAP_PORT,
};
pub use mail_error::MailError;
pub use mailbox_registry::{
    build_mailbox, registered_mailbox_types, MailboxConstructor, MailboxSettings, MAILBOX_TYPES,
};
pub use mime_message::parse_rfc822;
pub use smtp_channel::{SmtpChannel, SmtpChannelConfig, DEFAULT_SMTP_PORT};
