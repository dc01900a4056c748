//! GitHub Issues implementation of the tracker bot.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ticbot_core::{AuthorizationCheck, LabelHistory, SecretSource, Ticket, TicketState, TrackerBot};

use crate::github_api_client::{GithubApiClient, GithubApiError, RepoRef};
use crate::issue_labels::{build_ticket_labels, labels_match};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

#[derive(Debug, Clone)]
/// Public struct `GithubBotConfig` used across ticbot components.
pub struct GithubBotConfig {
    pub repo: String,
    pub token: SecretSource,
    pub api_base: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub ticket_labels: Vec<String>,
}

impl GithubBotConfig {
    pub fn new(repo: impl Into<String>, token: SecretSource) -> Self {
        Self {
            repo: repo.into(),
            token,
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            ticket_labels: Vec::new(),
        }
    }
}

/// Tracker bot acting on one GitHub repository.
pub struct GithubBot {
    client: GithubApiClient,
    ticket_labels: Vec<String>,
}

impl GithubBot {
    pub fn new(config: GithubBotConfig) -> Result<Self, GithubApiError> {
        let repo = RepoRef::parse(&config.repo)?;
        let client = GithubApiClient::new(
            &config.api_base,
            repo,
            config.token,
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;
        Ok(Self {
            client,
            ticket_labels: build_ticket_labels(config.ticket_labels.iter().map(String::as_str)),
        })
    }

    pub fn repo(&self) -> &RepoRef {
        self.client.repo()
    }
}

impl AuthorizationCheck for GithubBot {
    type Error = GithubApiError;

    fn check_authorization(&self) -> Result<bool, Self::Error> {
        let repository = self.client.get_repository()?;
        tracing::debug!(repo = %repository.full_name, "github token accepted");
        Ok(true)
    }

    fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str> {
        match error {
            GithubApiError::MissingToken(_) => Some("MissingToken"),
            GithubApiError::Unauthorized { .. } => Some("Unauthorized"),
            _ => None,
        }
    }
}

impl LabelHistory for GithubBot {
    fn label_added(&self, ticket: &Ticket, label: &str) -> Result<Option<DateTime<Utc>>> {
        let events = self
            .client
            .list_issue_events(ticket.number())
            .with_context(|| format!("failed to read label history of #{}", ticket.number()))?;
        Ok(events
            .iter()
            .filter(|event| event.is_labeled_with(label))
            .map(|event| event.created_at)
            .max())
    }
}

impl TrackerBot for GithubBot {
    fn token_secret(&self) -> &str {
        self.client.token().name()
    }

    fn create_ticket(&self, title: &str, body: &str) -> Result<Ticket> {
        let issue = self
            .client
            .create_issue(title, body, &self.ticket_labels)
            .with_context(|| format!("failed to create issue in {}", self.repo().as_slug()))?;
        tracing::debug!(number = issue.number, "created github issue");
        Ok(issue.into_ticket())
    }

    fn list_email_originated_tickets(&self, state: TicketState) -> Result<Vec<Ticket>> {
        let issues = self
            .client
            .list_issues(state)
            .with_context(|| format!("failed to list issues in {}", self.repo().as_slug()))?;
        Ok(issues
            .into_iter()
            .map(|issue| issue.into_ticket())
            .filter(Ticket::is_trackable)
            .collect())
    }

    fn make_comment(&self, ticket: &Ticket, text: &str) -> Result<()> {
        self.client
            .create_issue_comment(ticket.number(), text)
            .with_context(|| format!("failed to comment on #{}", ticket.number()))
    }

    fn add_label(&self, ticket: &Ticket, label: &str) -> Result<()> {
        if ticket
            .labels()
            .iter()
            .any(|current| labels_match(current, label))
        {
            self.remove_label(ticket, label)?;
        }
        self.client
            .add_issue_labels(ticket.number(), &[label])
            .with_context(|| format!("failed to add label '{label}' to #{}", ticket.number()))
    }

    fn remove_label(&self, ticket: &Ticket, label: &str) -> Result<()> {
        self.client
            .remove_issue_label(ticket.number(), label)
            .with_context(|| format!("failed to remove label '{label}' from #{}", ticket.number()))
    }
}
