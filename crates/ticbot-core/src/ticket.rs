//! Tracker tickets and the metadata block that ties them to e-mails.
//!
//! A ticket body produced from an e-mail looks like:
//!
//! ```text
//! ticket_id: '1790123456789'
//! From: Alice <alice@example.org>
//! Date: 2024-03-01T09:00:00+00:00
//! Subject: Printer on fire
//!
//! ---
//! <cleaned message content>
//! ```
//!
//! The block is YAML so tickets created by earlier deployments keep parsing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_yaml::Value;
use thiserror::Error;

use crate::content_cleaners::{clean_content, ContentCleaner};
use crate::message::Message;

pub const METADATA_SEPARATOR: &str = "---";
pub const TICKET_ID_KEY: &str = "ticket_id";

pub const NULL_TICKET_ID: &str = "<UNKNOWN ID>";
pub const NULL_TICKET_URL: &str = "<UNKNOWN URL>";
pub const NULL_TICKET_TITLE: &str = "<UNKNOWN TITLE>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketState {
    Open,
    All,
}

impl TicketState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::All => "all",
        }
    }
}

/// Identity of a ticket: the e-mail it was created from, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Present(String),
    Absent,
}

impl Identity {
    pub fn as_present(&self) -> Option<&str> {
        match self {
            Self::Present(id) => Some(id.as_str()),
            Self::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("ticket body has no metadata block")]
    MissingBlock,
    #[error("ticket metadata block is not valid YAML: {0}")]
    Malformed(#[from] serde_yaml::Error),
    #[error("ticket metadata block has no ticket_id")]
    MissingIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketMetadata {
    pub ticket_id: String,
    pub from: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A tracked issue as reported by the tracker.
pub struct Ticket {
    number: u64,
    title: String,
    url: String,
    body: String,
    date_created: DateTime<Utc>,
    assignees: Vec<String>,
    labels: Vec<String>,
    null: bool,
}

impl Ticket {
    pub fn new(
        number: u64,
        title: impl Into<String>,
        url: impl Into<String>,
        body: impl Into<String>,
        date_created: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            title: title.into(),
            url: url.into(),
            body: body.into(),
            date_created,
            assignees: Vec::new(),
            labels: Vec::new(),
            null: false,
        }
    }

    pub fn with_assignees(mut self, assignees: Vec<String>) -> Self {
        self.assignees = assignees;
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Placeholder returned instead of creating a ticket during dry runs.
    pub fn null() -> Self {
        Self {
            number: 0,
            title: NULL_TICKET_TITLE.to_string(),
            url: NULL_TICKET_URL.to_string(),
            body: String::new(),
            date_created: DateTime::<Utc>::UNIX_EPOCH,
            assignees: Vec::new(),
            labels: Vec::new(),
            null: true,
        }
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    pub fn assignees(&self) -> &[String] {
        &self.assignees
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label == name)
    }

    pub fn metadata(&self) -> Result<TicketMetadata, MetadataError> {
        if self.null {
            return Ok(TicketMetadata {
                ticket_id: NULL_TICKET_ID.to_string(),
                from: None,
                date: None,
                subject: None,
            });
        }
        parse_ticket_metadata(&self.body)
    }

    /// Missing and malformed metadata both mean "not trackable".
    pub fn identity(&self) -> Identity {
        match self.metadata() {
            Ok(metadata) => Identity::Present(metadata.ticket_id),
            Err(_) => Identity::Absent,
        }
    }

    pub fn is_trackable(&self) -> bool {
        self.identity().is_present()
    }
}

#[derive(Serialize)]
struct MetadataBlock<'a> {
    ticket_id: &'a str,
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Subject")]
    subject: &'a str,
}

/// Renders the ticket body for `message`: metadata block, separator, content.
pub fn ticket_body_from_message(
    message: &Message,
    cleaners: &[ContentCleaner],
) -> Result<String, serde_yaml::Error> {
    let block = serde_yaml::to_string(&MetadataBlock {
        ticket_id: message.unique_id(),
        from: message.from_header(),
        date: message.date().to_rfc3339(),
        subject: message.subject(),
    })?;
    let content = clean_content(message.content(), cleaners);
    Ok(format!("{block}\n{METADATA_SEPARATOR}\n{content}"))
}

fn front_matter(body: &str) -> &str {
    let mut lines = body.split_inclusive('\n');
    let mut start = 0;
    if let Some(first) = lines.clone().next() {
        if first.trim_end() == METADATA_SEPARATOR {
            start = first.len();
            lines.next();
        }
    }
    let mut offset = start;
    for line in lines {
        if line.trim_end() == METADATA_SEPARATOR {
            return &body[start..offset];
        }
        offset += line.len();
    }
    &body[start..]
}

pub fn parse_ticket_metadata(body: &str) -> Result<TicketMetadata, MetadataError> {
    let block = front_matter(body);
    if block.trim().is_empty() {
        return Err(MetadataError::MissingBlock);
    }
    let value: Value = serde_yaml::from_str(block)?;
    let Value::Mapping(mapping) = value else {
        return Err(MetadataError::MissingBlock);
    };
    let ticket_id = match mapping.get(TICKET_ID_KEY) {
        Some(Value::String(id)) => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    };
    if ticket_id.is_empty() {
        return Err(MetadataError::MissingIdentity);
    }
    let text = |key: &str| match mapping.get(key) {
        Some(Value::String(value)) => Some(value.clone()),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    };
    Ok(TicketMetadata {
        ticket_id,
        from: text("From"),
        date: text("Date").as_deref().and_then(parse_metadata_date),
        subject: text("Subject"),
    })
}

fn parse_metadata_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
