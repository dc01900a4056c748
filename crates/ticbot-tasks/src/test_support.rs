//! Scripted collaborators for workflow unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use ticbot_core::{
    AuthorizationCheck, LabelHistory, Mailbox, Message, OutgoingMail, OutgoingReply, Ticket,
    TicketState, TrackerBot,
};

#[derive(Debug, Error)]
pub(crate) enum ScriptedError {
    #[error("credentials rejected")]
    Rejected,
    #[error("provider unavailable")]
    Unavailable,
}

fn failure_kind(error: &ScriptedError) -> Option<&'static str> {
    match error {
        ScriptedError::Rejected => Some("Rejected"),
        ScriptedError::Unavailable => None,
    }
}

fn scripted_check(reject: bool) -> Result<bool, ScriptedError> {
    if reject {
        Err(ScriptedError::Rejected)
    } else {
        Ok(true)
    }
}

pub(crate) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
}

pub(crate) fn inbox_message(id: &str, subject: &str) -> Message {
    Message::new(id, at(9, 0))
        .with_subject(subject)
        .with_content(format!("Body of {subject}"))
        .with_header("From", "Customer <customer@example.com>")
        .with_header("To", "help@example.org")
        .with_header("Message-ID", format!("<{id}@mail.example.com>"))
}

pub(crate) struct ScriptedMailbox {
    pub address: String,
    pub secret: String,
    pub messages: Vec<Message>,
    pub reject: bool,
    pub fetches: Mutex<Vec<DateTime<Utc>>>,
}

impl ScriptedMailbox {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            address: "help@example.org".to_string(),
            secret: "INBOX_PASSWORD".to_string(),
            messages,
            reject: false,
            fetches: Mutex::new(Vec::new()),
        }
    }
}

impl AuthorizationCheck for ScriptedMailbox {
    type Error = ScriptedError;

    fn check_authorization(&self) -> Result<bool, Self::Error> {
        scripted_check(self.reject)
    }

    fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str> {
        failure_kind(error)
    }
}

impl Mailbox for ScriptedMailbox {
    fn own_address(&self) -> &str {
        &self.address
    }

    fn secret_name(&self) -> &str {
        &self.secret
    }

    fn fetch_recent_messages(&self, since: DateTime<Utc>) -> Result<Vec<Message>> {
        self.fetches.lock().unwrap().push(since);
        Ok(self.messages.clone())
    }
}

pub(crate) struct ScriptedOutgoing {
    pub address: String,
    pub secret: String,
    pub reject: bool,
    pub sent: Mutex<Vec<(OutgoingReply, Vec<String>)>>,
}

impl ScriptedOutgoing {
    pub fn new() -> Self {
        Self {
            address: "bot@example.org".to_string(),
            secret: "BOT_SMTP_PASSWORD".to_string(),
            reject: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<(OutgoingReply, Vec<String>)> {
        self.sent.lock().unwrap().clone()
    }
}

impl AuthorizationCheck for ScriptedOutgoing {
    type Error = ScriptedError;

    fn check_authorization(&self) -> Result<bool, Self::Error> {
        scripted_check(self.reject)
    }

    fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str> {
        failure_kind(error)
    }
}

impl OutgoingMail for ScriptedOutgoing {
    fn own_address(&self) -> &str {
        &self.address
    }

    fn secret_name(&self) -> &str {
        &self.secret
    }

    fn send_reply(&self, reply: &OutgoingReply, recipients: &[String]) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((reply.clone(), recipients.to_vec()));
        Ok(())
    }
}

/// In-memory tracker. Created tickets and label changes show up in later
/// calls; label events are stamped with the scripted clock.
pub(crate) struct ScriptedBot {
    pub token_secret: String,
    pub reject: bool,
    pub unavailable: bool,
    pub tickets: Mutex<Vec<Ticket>>,
    pub label_events: Mutex<HashMap<(u64, String), DateTime<Utc>>>,
    pub clock: Mutex<DateTime<Utc>>,
    pub failing_comments: Vec<u64>,
    pub created: Mutex<Vec<(String, String)>>,
    pub comments: Mutex<Vec<(u64, String)>>,
    pub labels_added: Mutex<Vec<(u64, String)>>,
    pub labels_removed: Mutex<Vec<(u64, String)>>,
    pub listed_states: Mutex<Vec<TicketState>>,
}

impl ScriptedBot {
    pub fn new(tickets: Vec<Ticket>) -> Self {
        Self {
            token_secret: "BOT_TOKEN".to_string(),
            reject: false,
            unavailable: false,
            tickets: Mutex::new(tickets),
            label_events: Mutex::new(HashMap::new()),
            clock: Mutex::new(at(12, 0)),
            failing_comments: Vec::new(),
            created: Mutex::new(Vec::new()),
            comments: Mutex::new(Vec::new()),
            labels_added: Mutex::new(Vec::new()),
            labels_removed: Mutex::new(Vec::new()),
            listed_states: Mutex::new(Vec::new()),
        }
    }

    pub fn with_label_event(mut self, number: u64, label: &str, when: DateTime<Utc>) -> Self {
        self.label_events
            .get_mut()
            .unwrap()
            .insert((number, label.to_string()), when);
        self
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.clock.lock().unwrap() = now;
    }

    pub fn ticket(&self, number: u64) -> Ticket {
        self.tickets
            .lock()
            .unwrap()
            .iter()
            .find(|ticket| ticket.number() == number)
            .cloned()
            .expect("scripted ticket")
    }

    fn relabel(&self, number: u64, update: impl FnOnce(&mut Vec<String>)) {
        let mut tickets = self.tickets.lock().unwrap();
        if let Some(ticket) = tickets.iter_mut().find(|ticket| ticket.number() == number) {
            let mut labels = ticket.labels().to_vec();
            update(&mut labels);
            *ticket = ticket.clone().with_labels(labels);
        }
    }

    pub fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn labels_added(&self) -> Vec<(u64, String)> {
        self.labels_added.lock().unwrap().clone()
    }

    pub fn labels_removed(&self) -> Vec<(u64, String)> {
        self.labels_removed.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.created().len()
            + self.comments().len()
            + self.labels_added().len()
            + self.labels_removed().len()
    }
}

impl AuthorizationCheck for ScriptedBot {
    type Error = ScriptedError;

    fn check_authorization(&self) -> Result<bool, Self::Error> {
        if self.unavailable {
            return Err(ScriptedError::Unavailable);
        }
        scripted_check(self.reject)
    }

    fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str> {
        failure_kind(error)
    }
}

impl LabelHistory for ScriptedBot {
    fn label_added(&self, ticket: &Ticket, label: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .label_events
            .lock()
            .unwrap()
            .get(&(ticket.number(), label.to_string()))
            .copied())
    }
}

impl TrackerBot for ScriptedBot {
    fn token_secret(&self) -> &str {
        &self.token_secret
    }

    fn create_ticket(&self, title: &str, body: &str) -> Result<Ticket> {
        let mut tickets = self.tickets.lock().unwrap();
        let number = tickets.iter().map(Ticket::number).max().unwrap_or(0) + 1;
        let ticket = Ticket::new(
            number,
            title,
            format!("https://github.com/acme/help/issues/{number}"),
            body,
            at(12, 0),
        );
        tickets.push(ticket.clone());
        self.created
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(ticket)
    }

    fn list_email_originated_tickets(&self, state: TicketState) -> Result<Vec<Ticket>> {
        self.listed_states.lock().unwrap().push(state);
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|ticket| ticket.is_trackable())
            .cloned()
            .collect())
    }

    fn make_comment(&self, ticket: &Ticket, text: &str) -> Result<()> {
        if self.failing_comments.contains(&ticket.number()) {
            bail!("comment rejected for ticket #{}", ticket.number());
        }
        self.comments
            .lock()
            .unwrap()
            .push((ticket.number(), text.to_string()));
        Ok(())
    }

    fn add_label(&self, ticket: &Ticket, label: &str) -> Result<()> {
        self.labels_added
            .lock()
            .unwrap()
            .push((ticket.number(), label.to_string()));
        self.relabel(ticket.number(), |labels| {
            if !labels.iter().any(|current| current == label) {
                labels.push(label.to_string());
            }
        });
        let now = *self.clock.lock().unwrap();
        self.label_events
            .lock()
            .unwrap()
            .insert((ticket.number(), label.to_string()), now);
        Ok(())
    }

    fn remove_label(&self, ticket: &Ticket, label: &str) -> Result<()> {
        self.labels_removed
            .lock()
            .unwrap()
            .push((ticket.number(), label.to_string()));
        self.relabel(ticket.number(), |labels| {
            labels.retain(|current| current != label)
        });
        Ok(())
    }
}

pub(crate) fn tracked_ticket(number: u64, ticket_id: &str, created: DateTime<Utc>) -> Ticket {
    Ticket::new(
        number,
        format!("Ticket {number}"),
        format!("https://github.com/acme/help/issues/{number}"),
        format!("ticket_id: '{ticket_id}'\nFrom: customer@example.com\n\n---\nHello"),
        created,
    )
}
