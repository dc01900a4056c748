//! Configuration file model and loading.
//!
//! The file is YAML or TOML, chosen by extension. Workflow blocks stay
//! loosely typed (`serde_json::Value`, insertion-ordered) until a workflow
//! converts its own block with [`crate::task_runtime::Workflow::build_config`].

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use ticbot_core::{DurationParseError, DurationSpec, TeamMember};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to parse TOML config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unsupported config file {0}; expected .yaml, .yml or .toml")]
    UnsupportedFormat(PathBuf),
    #[error("workflow '{workflow}': {message}")]
    Workflow { workflow: String, message: String },
    #[error("workflow '{workflow}': invalid duration for '{key}': {source}")]
    Duration {
        workflow: String,
        key: String,
        #[source]
        source: DurationParseError,
    },
    #[error("unknown filter '{name}' (known: {known})")]
    UnknownFilter { name: String, known: String },
    #[error("template {name}: {message}")]
    Template { name: String, message: String },
    #[error("invalid cron expression '{expression}': {message}")]
    Cron { expression: String, message: String },
    #[error("unknown workflow '{name}' (known: {known})")]
    UnknownWorkflow { name: String, known: String },
}

impl ConfigError {
    pub(crate) fn workflow(workflow: &str, message: impl Into<String>) -> Self {
        Self::Workflow {
            workflow: workflow.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Public struct `ConfigFile` used across ticbot components.
pub struct ConfigFile {
    pub config: CoreConfig,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    #[serde(default)]
    pub workflows: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
/// Public struct `CoreConfig` used across ticbot components.
pub struct CoreConfig {
    pub inbox: InboxConfig,
    pub bot: BotConfig,
    #[serde(default)]
    pub team: Vec<TeamMember>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
/// Public struct `InboxConfig` used across ticbot components.
pub struct InboxConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub secret: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
/// Public struct `BotConfig` used across ticbot components.
pub struct BotConfig {
    pub repo: String,
    pub token_secret: String,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    #[serde(default)]
    pub retry_max_attempts: Option<usize>,
    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,
    #[serde(default)]
    pub ticket_labels: Vec<String>,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
/// Public struct `SmtpConfig` used across ticbot components.
pub struct SmtpConfig {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub user: String,
    pub secret: String,
}

impl ConfigFile {
    /// Team members from the top level followed by those under `config`.
    pub fn team(&self) -> Vec<TeamMember> {
        self.team
            .iter()
            .chain(self.config.team.iter())
            .cloned()
            .collect()
    }

    /// Raw block of workflow `name`, if present.
    pub fn workflow_value(&self, name: &str) -> Option<&Value> {
        self.workflows.get(name)
    }
}

/// Loads a YAML or TOML configuration file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    let parsed = match extension.as_deref() {
        Some("yaml" | "yml") => parse_yaml_config(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?,
        Some("toml") => parse_toml_config(&raw).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?,
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };
    tracing::debug!(
        path = %path.display(),
        workflows = parsed.workflows.len(),
        "loaded configuration"
    );
    Ok(parsed)
}

pub fn parse_yaml_config(raw: &str) -> Result<ConfigFile, serde_yaml::Error> {
    serde_yaml::from_str(raw)
}

pub fn parse_toml_config(raw: &str) -> Result<ConfigFile, toml::de::Error> {
    toml::from_str(raw)
}

/// Deserializes workflow-specific keys into `T`, reporting the workflow name
/// on failure.
pub(crate) fn settings_from_map<T: DeserializeOwned>(
    workflow: &str,
    settings: &Map<String, Value>,
) -> Result<T, ConfigError> {
    serde_json::from_value(Value::Object(settings.clone()))
        .map_err(|error| ConfigError::workflow(workflow, error.to_string()))
}

pub(crate) fn duration_setting(
    workflow: &str,
    key: &str,
    spec: &DurationSpec,
) -> Result<Duration, ConfigError> {
    spec.to_duration().map_err(|source| ConfigError::Duration {
        workflow: workflow.to_string(),
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{load_config_file, parse_toml_config, parse_yaml_config, ConfigError};

    const SAMPLE_YAML: &str = r#"
config:
  inbox:
    type: gmail
    user: help@example.org
    secret: INBOX_PASSWORD
  bot:
    repo: acme/help
    token-secret: BOT_TOKEN
    smtp:
      host: smtp.gmail.com
      port: 465
      user: bot@example.org
      secret: BOT_SMTP_PASSWORD
  team:
    - {name: Carol, email: carol@example.org}
team:
  - {name: Alice, email: alice@example.org, github: alice}
workflows:
  emails-to-issues:
    active: true
    recent: {hours: 48}
  unassigned-reminder:
    delay: 2h
    snooze-labels:
      snooze-5-minutes: {minutes: 5}
      snooze-5-hours: {hours: 5}
      snooze-1-day: 1d
"#;

    #[test]
    fn functional_yaml_config_parses_core_and_workflows() {
        let config = parse_yaml_config(SAMPLE_YAML).expect("config");
        assert_eq!(config.config.inbox.kind, "gmail");
        assert_eq!(config.config.bot.token_secret, "BOT_TOKEN");
        let smtp = config.config.bot.smtp.as_ref().expect("smtp");
        assert_eq!(smtp.port, Some(465));

        let team = config.team();
        assert_eq!(team.len(), 2);
        assert_eq!(team[0].github.as_deref(), Some("alice"));
        assert_eq!(team[1].email, "carol@example.org");

        assert!(config.workflow_value("emails-to-issues").is_some());
        assert!(config.workflow_value("stale-reminder").is_none());
    }

    #[test]
    fn regression_snooze_labels_keep_document_order() {
        let config = parse_yaml_config(SAMPLE_YAML).expect("config");
        let block = config
            .workflow_value("unassigned-reminder")
            .and_then(|value| value.get("snooze-labels"))
            .and_then(|value| value.as_object())
            .expect("snooze labels");
        let names = block.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(names, vec!["snooze-5-minutes", "snooze-5-hours", "snooze-1-day"]);
    }

    #[test]
    fn functional_toml_config_matches_yaml_shape() {
        let config = parse_toml_config(
            r#"
[config.inbox]
type = "gmail"
user = "help@example.org"
secret = "INBOX_PASSWORD"

[config.bot]
repo = "acme/help"
token-secret = "BOT_TOKEN"

[[team]]
email = "alice@example.org"

[workflows.authorization-check]
active = true
"#,
        )
        .expect("config");
        assert!(config.config.bot.smtp.is_none());
        assert_eq!(config.team().len(), 1);
        assert!(config.workflow_value("authorization-check").is_some());
    }

    #[test]
    fn integration_load_config_file_selects_parser_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yaml_path = dir.path().join("ticbot.yml");
        std::fs::File::create(&yaml_path)
            .and_then(|mut file| file.write_all(SAMPLE_YAML.as_bytes()))
            .expect("write yaml");
        assert!(load_config_file(&yaml_path).is_ok());

        let json_path = dir.path().join("ticbot.json");
        std::fs::write(&json_path, "{}").expect("write json");
        assert!(matches!(
            load_config_file(&json_path),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        assert!(matches!(
            load_config_file(&dir.path().join("missing.yaml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn regression_unknown_bot_keys_are_rejected() {
        let error = parse_yaml_config(
            "config:\n  inbox: {type: gmail, user: a@b.org, secret: X}\n  \
             bot: {repo: a/b, token-secret: T, tokn: oops}\n",
        )
        .expect_err("unknown key");
        assert!(error.to_string().contains("tokn"));
    }
}
