use std::time::Duration;

use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use ticbot_core::{SecretSource, TicketState};

use crate::github_transport_helpers::{
    is_authorization_status, is_retryable_github_status, is_retryable_transport_error,
    parse_retry_after, retry_delay, truncate_for_error, ERROR_BODY_LIMIT,
};
use crate::issue_types::{GithubIssue, GithubIssueEvent, GithubRepository};

const PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error("no github token available from '{0}'")]
    MissingToken(String),
    #[error("github rejected the token during {operation} (status {status})")]
    Unauthorized { operation: String, status: u16 },
    #[error("github api {operation} failed with status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },
    #[error("github api {operation} request failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode github {operation}: {source}")]
    Decode {
        operation: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid github configuration: {0}")]
    InvalidConfig(String),
}

impl GithubApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// `owner/name` pair identifying the tracker repository.
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(raw: &str) -> Result<Self, GithubApiError> {
        let invalid = || {
            GithubApiError::InvalidConfig(format!("invalid repo '{raw}', expected owner/repo"))
        };
        let (owner, name) = raw.trim().split_once('/').ok_or_else(invalid)?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Blocking GitHub REST client scoped to one repository.
///
/// The token is resolved on every request so a rotated secret is picked up
/// without rebuilding the client.
pub(crate) struct GithubApiClient {
    http: reqwest::blocking::Client,
    api_base: Url,
    repo: RepoRef,
    token: SecretSource,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GithubApiClient {
    pub(crate) fn new(
        api_base: &str,
        repo: RepoRef,
        token: SecretSource,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self, GithubApiError> {
        let api_base = Url::parse(api_base.trim()).map_err(|error| {
            GithubApiError::InvalidConfig(format!("invalid api base '{api_base}': {error}"))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(GithubApiError::InvalidConfig(format!(
                "api base '{api_base}' cannot carry a path"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("ticbot"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .map_err(|source| GithubApiError::Transport {
                operation: "build client".to_string(),
                source,
            })?;

        Ok(Self {
            http,
            api_base,
            repo,
            token,
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    pub(crate) fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub(crate) fn token(&self) -> &SecretSource {
        &self.token
    }

    pub(crate) fn get_repository(&self) -> Result<GithubRepository, GithubApiError> {
        let url = self.repo_endpoint(&[])?;
        self.request_json("get repository", || self.http.get(url.clone()))
    }

    pub(crate) fn create_issue(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<GithubIssue, GithubApiError> {
        let url = self.repo_endpoint(&["issues"])?;
        let payload = if labels.is_empty() {
            json!({ "title": title, "body": body })
        } else {
            json!({ "title": title, "body": body, "labels": labels })
        };
        self.request_json("create issue", || self.http.post(url.clone()).json(&payload))
    }

    /// All issues in `state`, oldest first, pull requests excluded.
    pub(crate) fn list_issues(
        &self,
        state: TicketState,
    ) -> Result<Vec<GithubIssue>, GithubApiError> {
        let url = self.repo_endpoint(&["issues"])?;
        self.paged("list issues", |page| {
            self.http.get(url.clone()).query(&[
                ("state", state.as_str()),
                ("sort", "created"),
                ("direction", "asc"),
                ("per_page", "100"),
                ("page", page),
            ])
        })
        .map(|issues: Vec<GithubIssue>| {
            issues
                .into_iter()
                .filter(|issue| !issue.is_pull_request())
                .collect()
        })
    }

    pub(crate) fn list_issue_events(
        &self,
        issue_number: u64,
    ) -> Result<Vec<GithubIssueEvent>, GithubApiError> {
        let number = issue_number.to_string();
        let url = self.repo_endpoint(&["issues", &number, "events"])?;
        self.paged("list issue events", |page| {
            self.http
                .get(url.clone())
                .query(&[("per_page", "100"), ("page", page)])
        })
    }

    pub(crate) fn create_issue_comment(
        &self,
        issue_number: u64,
        body: &str,
    ) -> Result<(), GithubApiError> {
        let number = issue_number.to_string();
        let url = self.repo_endpoint(&["issues", &number, "comments"])?;
        let payload = json!({ "body": body });
        self.send("create issue comment", || {
            self.http.post(url.clone()).json(&payload)
        })?;
        Ok(())
    }

    pub(crate) fn add_issue_labels(
        &self,
        issue_number: u64,
        labels: &[&str],
    ) -> Result<(), GithubApiError> {
        let number = issue_number.to_string();
        let url = self.repo_endpoint(&["issues", &number, "labels"])?;
        let payload = json!({ "labels": labels });
        self.send("add issue labels", || self.http.post(url.clone()).json(&payload))?;
        Ok(())
    }

    /// Removes `label`; a label that is already gone is not an error.
    pub(crate) fn remove_issue_label(
        &self,
        issue_number: u64,
        label: &str,
    ) -> Result<(), GithubApiError> {
        let number = issue_number.to_string();
        let url = self.repo_endpoint(&["issues", &number, "labels", label])?;
        match self.send("remove issue label", || self.http.delete(url.clone())) {
            Ok(_) => Ok(()),
            Err(error) if error.status() == Some(StatusCode::NOT_FOUND.as_u16()) => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn repo_endpoint(&self, segments: &[&str]) -> Result<Url, GithubApiError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GithubApiError::InvalidConfig(format!(
                    "api base '{}' cannot carry a path",
                    self.api_base
                ))
            })?
            .pop_if_empty()
            .extend(["repos", self.repo.owner.as_str(), self.repo.name.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn paged<T, F>(&self, operation: &str, mut request_builder: F) -> Result<Vec<T>, GithubApiError>
    where
        T: DeserializeOwned,
        F: FnMut(&str) -> RequestBuilder,
    {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<T> = self.request_json(operation, || request_builder(&page_value))?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T, GithubApiError>
    where
        T: DeserializeOwned,
        F: FnMut() -> RequestBuilder,
    {
        let response = self.send(operation, request_builder)?;
        response
            .json::<T>()
            .map_err(|source| GithubApiError::Decode {
                operation: operation.to_string(),
                source,
            })
    }

    fn send<F>(&self, operation: &str, mut request_builder: F) -> Result<Response, GithubApiError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let token = self
            .token
            .resolve()
            .ok_or_else(|| GithubApiError::MissingToken(self.token.name().to_string()))?;
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder().bearer_auth(token.trim()).send();
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let status = status.as_u16();
                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().unwrap_or_default();
                    if attempt < self.retry_max_attempts && is_retryable_github_status(status) {
                        tracing::debug!(operation, status, attempt, "retrying github request");
                        std::thread::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ));
                        continue;
                    }
                    if is_authorization_status(status) {
                        return Err(GithubApiError::Unauthorized {
                            operation: operation.to_string(),
                            status,
                        });
                    }
                    return Err(GithubApiError::Status {
                        operation: operation.to_string(),
                        status,
                        body: truncate_for_error(&body, ERROR_BODY_LIMIT),
                    });
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tracing::debug!(operation, attempt, %error, "retrying github request");
                        std::thread::sleep(retry_delay(self.retry_base_delay_ms, attempt, None));
                        continue;
                    }
                    return Err(GithubApiError::Transport {
                        operation: operation.to_string(),
                        source: error,
                    });
                }
            }
        }
    }
}
