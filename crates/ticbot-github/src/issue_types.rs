use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ticbot_core::Ticket;

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubUser` used across ticbot components.
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubIssueLabel` used across ticbot components.
pub struct GithubIssueLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// Public struct `GithubIssue` used across ticbot components.
pub struct GithubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub assignees: Vec<GithubUser>,
    #[serde(default)]
    pub labels: Vec<GithubIssueLabel>,
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl GithubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn into_ticket(self) -> Ticket {
        Ticket::new(
            self.number,
            self.title,
            self.html_url,
            self.body.unwrap_or_default(),
            self.created_at,
        )
        .with_assignees(self.assignees.into_iter().map(|user| user.login).collect())
        .with_labels(self.labels.into_iter().map(|label| label.name).collect())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
/// One entry of an issue's event timeline.
pub struct GithubIssueEvent {
    pub event: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub label: Option<GithubIssueLabel>,
}

impl GithubIssueEvent {
    pub fn is_labeled_with(&self, name: &str) -> bool {
        self.event == "labeled"
            && self
                .label
                .as_ref()
                .is_some_and(|label| crate::issue_labels::labels_match(&label.name, name))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GithubRepository {
    pub(crate) full_name: String,
}
