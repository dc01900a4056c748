//! GitHub Issues tracker bot for ticbot.
//!
//! Implements [`ticbot_core::TrackerBot`] over the blocking GitHub REST API
//! with retry/backoff for rate limits and server errors.

mod github_api_client;
mod github_bot;
mod github_transport_helpers;
pub mod issue_labels;
pub mod issue_types;

pub use github_api_client::{GithubApiError, RepoRef};
pub use github_bot::{
    GithubBot, GithubBotConfig, DEFAULT_GITHUB_API_BASE, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS,
};
