use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An inbound e-mail as fetched from the mailbox. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    unique_id: String,
    subject: String,
    date: DateTime<Utc>,
    content: String,
    headers: Vec<(String, String)>,
    labels: Vec<String>,
}

impl Message {
    pub fn new(unique_id: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            unique_id: unique_id.into(),
            subject: String::new(),
            date,
            content: String::new(),
            headers: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Stable identity derived from the provider's transport marker.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// First value of the named header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn from_header(&self) -> &str {
        self.header("From").unwrap_or_default()
    }

    pub fn to_header(&self) -> &str {
        self.header("To").unwrap_or_default()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.header("Message-ID")
    }
}

/// Returns true when `address` occurs inside a raw address header such as
/// `"Alice <alice@example.org>, bob@example.org"`.
pub fn header_mentions_address(header: &str, address: &str) -> bool {
    let address = address.trim();
    if address.is_empty() {
        return false;
    }
    header
        .to_ascii_lowercase()
        .contains(&address.to_ascii_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A person on the team answering the shared inbox.
pub struct TeamMember {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub github: Option<String>,
}

impl TeamMember {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
            github: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_github(mut self, login: impl Into<String>) -> Self {
        self.github = Some(login.into());
        self
    }

    /// Matches a recipient reference against name, e-mail or login.
    pub fn matches_reference(&self, reference: &str) -> bool {
        let reference = reference.trim();
        self.email.eq_ignore_ascii_case(reference)
            || self
                .name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(reference))
            || self
                .github
                .as_deref()
                .is_some_and(|login| login.eq_ignore_ascii_case(reference))
    }
}

/// A reply ready to hand to the outgoing-mail channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub in_reply_to: Option<String>,
    pub thread_topic: Option<String>,
}

impl OutgoingReply {
    /// Header-and-body rendering used for operator logs.
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        rendered.push_str(&format!("Subject: {}\n", self.subject));
        rendered.push_str(&format!("To: {}\n", self.to.join(", ")));
        rendered.push_str(&format!("From: {}\n", self.from));
        if let Some(in_reply_to) = self.in_reply_to.as_deref() {
            rendered.push_str(&format!("In-Reply-To: {in_reply_to}\n"));
            rendered.push_str(&format!("References: {in_reply_to}\n"));
        }
        if let Some(topic) = self.thread_topic.as_deref() {
            rendered.push_str(&format!("Thread-Topic: {topic}\n"));
        }
        rendered.push('\n');
        rendered.push_str(&self.body);
        rendered
    }
}

/// Prefixes `RE: ` unless the subject already carries it (case-insensitive).
pub fn reply_subject(subject: &str) -> String {
    let already_reply = subject
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re: "));
    if already_reply {
        subject.to_string()
    } else {
        format!("RE: {subject}")
    }
}
