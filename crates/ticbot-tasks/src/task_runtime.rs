//! Shared execution gate for every workflow.
//!
//! A run goes: look up the block, skip when absent or inactive, resolve the
//! dry-run flag, validate `cron`, convert the block into the workflow's typed
//! configuration, then execute. Conversion happens before any collaborator
//! call, so structurally invalid configuration never reaches the network.

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use ticbot_core::{LogSink, Mailbox, OutgoingMail, TeamMember, TrackerBot};

use crate::authorization_check::AuthorizationCheckTask;
use crate::config::ConfigError;
use crate::emails_to_issues::EmailsToIssues;
use crate::filters::FilterContext;
use crate::reminders::{ReminderTask, StaleReminder, UnassignedReminder};
use crate::workflow_schedule::parse_workflow_cron;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Skipped,
    Completed,
    Failed,
}

impl TaskOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_failure(self) -> bool {
        self == Self::Failed
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reports whether a named secret is available to this process.
pub type SecretProbe = fn(&str) -> bool;

pub fn env_secret_present(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| !value.trim().is_empty())
}

/// Collaborators and ambient inputs shared by every task in one process run.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub mailbox: &'a dyn Mailbox,
    pub bot: &'a dyn TrackerBot,
    pub outgoing: Option<&'a dyn OutgoingMail>,
    pub team: &'a [TeamMember],
    pub sink: &'a dyn LogSink,
    pub now: DateTime<Utc>,
    pub secret_present: SecretProbe,
}

impl<'a> TaskContext<'a> {
    pub fn new(
        mailbox: &'a dyn Mailbox,
        bot: &'a dyn TrackerBot,
        outgoing: Option<&'a dyn OutgoingMail>,
        team: &'a [TeamMember],
        sink: &'a dyn LogSink,
    ) -> Self {
        Self {
            mailbox,
            bot,
            outgoing,
            team,
            sink,
            now: Utc::now(),
            secret_present: env_secret_present,
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_secret_probe(mut self, probe: SecretProbe) -> Self {
        self.secret_present = probe;
        self
    }

    pub fn filter_context(&self) -> FilterContext<'a> {
        FilterContext {
            mailbox_address: self.mailbox.own_address(),
            outgoing_address: self.outgoing.map(|outgoing| outgoing.own_address()),
            team: self.team,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
/// Common keys of a workflow block; everything else is workflow-specific.
pub struct WorkflowBlock {
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub dry: bool,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

impl WorkflowBlock {
    /// `None` for a missing, null or empty block.
    pub fn from_value(workflow: &str, value: Option<&Value>) -> Result<Option<Self>, ConfigError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|error| ConfigError::workflow(workflow, error.to_string())),
        }
    }
}

/// Explicit call-time value, then the block's `dry` key.
pub fn resolve_dry_run(dry_override: Option<bool>, configured: bool) -> bool {
    dry_override.unwrap_or(configured)
}

/// A scheduled job with a fail-fast configuration step.
pub trait Workflow {
    const NAME: &'static str;
    type Config: fmt::Debug;

    fn build_config(
        settings: &Map<String, Value>,
        context: &TaskContext<'_>,
    ) -> Result<Self::Config, ConfigError>;

    fn execute(config: &Self::Config, context: &TaskContext<'_>, dry: bool) -> Result<TaskOutcome>;
}

/// Runs workflow `W` against its raw block.
pub fn run_workflow<W: Workflow>(
    block: Option<&Value>,
    context: &TaskContext<'_>,
    dry_override: Option<bool>,
) -> Result<TaskOutcome> {
    let Some(block) = WorkflowBlock::from_value(W::NAME, block)? else {
        context
            .sink
            .info(&format!("{}: not configured; skipping", W::NAME));
        return Ok(TaskOutcome::Skipped);
    };
    if !block.active {
        context.sink.info(&format!("{}: inactive; skipping", W::NAME));
        return Ok(TaskOutcome::Skipped);
    }
    let dry = resolve_dry_run(dry_override, block.dry);
    if let Some(expression) = block.cron.as_deref() {
        parse_workflow_cron(expression)?;
    }
    let config = W::build_config(&block.settings, context)?;
    context
        .sink
        .info(&format!("Running {} with config {config:?}", W::NAME));
    let outcome = W::execute(&config, context, dry)?;
    context.sink.info(&format!("{}: {outcome}", W::NAME));
    Ok(outcome)
}

/// Builds workflow `W`'s configuration without executing it. Returns
/// whether the block is configured and active.
pub fn check_workflow<W: Workflow>(
    block: Option<&Value>,
    context: &TaskContext<'_>,
) -> Result<bool, ConfigError> {
    let Some(block) = WorkflowBlock::from_value(W::NAME, block)? else {
        return Ok(false);
    };
    if !block.active {
        return Ok(false);
    }
    if let Some(expression) = block.cron.as_deref() {
        parse_workflow_cron(expression)?;
    }
    W::build_config(&block.settings, context)?;
    Ok(true)
}

pub type WorkflowRunner =
    fn(Option<&Value>, &TaskContext<'_>, Option<bool>) -> Result<TaskOutcome>;
pub type WorkflowChecker = fn(Option<&Value>, &TaskContext<'_>) -> Result<bool, ConfigError>;

/// Registration entry mapping a workflow block name to its entry points.
pub struct RegisteredWorkflow {
    pub name: &'static str,
    pub run: WorkflowRunner,
    pub check: WorkflowChecker,
}

const fn register<W: Workflow>() -> RegisteredWorkflow {
    RegisteredWorkflow {
        name: W::NAME,
        run: run_workflow::<W>,
        check: check_workflow::<W>,
    }
}

pub const WORKFLOWS: &[RegisteredWorkflow] = &[
    register::<AuthorizationCheckTask>(),
    register::<EmailsToIssues>(),
    register::<ReminderTask<UnassignedReminder>>(),
    register::<ReminderTask<StaleReminder>>(),
];

pub fn registered_workflow_names() -> Vec<&'static str> {
    WORKFLOWS.iter().map(|workflow| workflow.name).collect()
}

pub fn find_workflow(name: &str) -> Result<&'static RegisteredWorkflow, ConfigError> {
    WORKFLOWS
        .iter()
        .find(|workflow| workflow.name == name.trim())
        .ok_or_else(|| ConfigError::UnknownWorkflow {
            name: name.to_string(),
            known: registered_workflow_names().join(", "),
        })
}
