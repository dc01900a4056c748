//! Scheduled ticbot workflows and their configuration.
//!
//! Every workflow goes through [`task_runtime::run_workflow`]: absent and
//! inactive blocks are skipped, the dry-run flag is resolved, and the block
//! is converted into a typed configuration before any collaborator is
//! touched.

pub mod authorization_check;
pub mod config;
pub mod emails_to_issues;
pub mod filters;
pub mod reminders;
pub mod task_runtime;
pub mod text_template;
pub mod workflow_schedule;

#[cfg(test)]
mod test_support;

pub use authorization_check::{secret_exists, AuthorizationCheckTask};
pub use config::{load_config_file, ConfigError, ConfigFile};
pub use emails_to_issues::{messages_without_tickets, EmailsToIssues, EmailsToIssuesConfig};
pub use filters::{FilterChain, FilterContext, FilterSpec, MessageFilter, FILTERS};
pub use reminders::{
    reminder_anchor, remind_ticket, resolve_recipients, ReminderConfig, ReminderTask,
    ReminderVariant, SnoozeLabel, StaleReminder, UnassignedReminder,
};
pub use task_runtime::{
    check_workflow, env_secret_present, find_workflow, registered_workflow_names, run_workflow,
    RegisteredWorkflow, TaskContext, TaskOutcome, Workflow, WorkflowBlock, WORKFLOWS,
};
pub use text_template::TextTemplate;
pub use workflow_schedule::parse_workflow_cron;
