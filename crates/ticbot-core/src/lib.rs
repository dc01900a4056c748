//! Foundational domain types shared across ticbot crates.
//!
//! Provides messages, tickets and their identity block, the authorization
//! capability shared by every credentialed collaborator, collaborator
//! contracts, the explicit log sink, and duration utilities.

pub mod authorization;
pub mod collaborators;
pub mod content_cleaners;
pub mod log_sink;
pub mod message;
pub mod secrets;
pub mod ticket;
pub mod time_utils;

pub use authorization::{validate_authorization, Authorizable, AuthorizationCheck};
pub use collaborators::{LabelHistory, Mailbox, OutgoingMail, TrackerBot};
pub use content_cleaners::{clean_content, ContentCleaner, DEFAULT_CLEANERS};
pub use log_sink::{CapturingSink, LogRecord, LogSink, Severity, TracingSink};
pub use message::{header_mentions_address, reply_subject, Message, OutgoingReply, TeamMember};
pub use secrets::SecretSource;
pub use ticket::{
    parse_ticket_metadata, ticket_body_from_message, Identity, MetadataError, Ticket,
    TicketMetadata, TicketState,
};
pub use time_utils::{
    format_duration, is_due_at, parse_compact_duration, DurationParseError, DurationParts,
    DurationSpec,
};
