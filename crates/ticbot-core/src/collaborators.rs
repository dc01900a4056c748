//! Contracts for the external systems the workflows drive.
//!
//! Concrete implementations live in `ticbot-github` and `ticbot-mail`; the
//! workflows only see these traits, so tests can script every collaborator.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::authorization::Authorizable;
use crate::message::{Message, OutgoingReply};
use crate::ticket::{Ticket, TicketState};

/// The shared inbox the tickets come from.
pub trait Mailbox: Authorizable {
    fn own_address(&self) -> &str;

    /// Environment variable holding the mailbox credential.
    fn secret_name(&self) -> &str;

    /// Messages dated at or after `since`, in provider order.
    fn fetch_recent_messages(&self, since: DateTime<Utc>) -> Result<Vec<Message>>;
}

/// Channel the bot uses to send mail as itself.
pub trait OutgoingMail: Authorizable {
    fn own_address(&self) -> &str;

    fn secret_name(&self) -> &str;

    fn send_reply(&self, reply: &OutgoingReply, recipients: &[String]) -> Result<()>;
}

/// When a label was last applied to a ticket.
pub trait LabelHistory {
    fn label_added(&self, ticket: &Ticket, label: &str) -> Result<Option<DateTime<Utc>>>;
}

/// The issue-tracker client.
pub trait TrackerBot: Authorizable + LabelHistory {
    /// Environment variable holding the tracker token.
    fn token_secret(&self) -> &str;

    fn create_ticket(&self, title: &str, body: &str) -> Result<Ticket>;

    /// Tickets whose body carries a valid identity block.
    fn list_email_originated_tickets(&self, state: TicketState) -> Result<Vec<Ticket>>;

    fn make_comment(&self, ticket: &Ticket, text: &str) -> Result<()>;

    /// Applies `label`, re-applying it when already present so the tracker
    /// records a fresh "labeled" event.
    fn add_label(&self, ticket: &Ticket, label: &str) -> Result<()>;

    /// Removes `label`; a label the ticket no longer carries is not an error.
    fn remove_label(&self, ticket: &Ticket, label: &str) -> Result<()>;
}
