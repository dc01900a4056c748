//! Reminder sweep over open email tickets.
//!
//! Each candidate ticket has an anchor time: the moment its first configured
//! snooze label was applied plus that label's duration, or its creation time
//! plus the base delay when no snooze label is present. A reminder is due once
//! `now` reaches the anchor. Posting a reminder re-applies a marker label,
//! which moves the anchor forward so the next sweep stays quiet.

use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use minijinja::context;
use serde::Deserialize;
use serde_json::{Map, Value};
use ticbot_core::{is_due_at, DurationSpec, LabelHistory, TeamMember, Ticket, TicketState};

use crate::config::{duration_setting, settings_from_map, ConfigError};
use crate::task_runtime::{TaskContext, TaskOutcome, Workflow};
use crate::text_template::{
    TextTemplate, DEFAULT_STALE_REMINDER_TEMPLATE, DEFAULT_UNASSIGNED_REMINDER_TEMPLATE,
};

/// Notify entry that expands to the ticket's assignees.
pub const NOTIFY_ASSIGNEES: &str = "assignees";

/// Selects which open tickets a reminder workflow looks at.
pub trait ReminderVariant {
    const NAME: &'static str;
    const REMINDER_TYPE: &'static str;
    const DEFAULT_TEMPLATE_NAME: &'static str;
    const DEFAULT_TEMPLATE: &'static str;

    fn is_candidate(ticket: &Ticket) -> bool;
}

/// Open tickets nobody has picked up.
pub struct UnassignedReminder;

impl ReminderVariant for UnassignedReminder {
    const NAME: &'static str = "unassigned-reminder";
    const REMINDER_TYPE: &'static str = "unassigned";
    const DEFAULT_TEMPLATE_NAME: &'static str = "unassigned_reminder.txt";
    const DEFAULT_TEMPLATE: &'static str = DEFAULT_UNASSIGNED_REMINDER_TEMPLATE;

    fn is_candidate(ticket: &Ticket) -> bool {
        ticket.assignees().is_empty()
    }
}

/// Open tickets that are assigned but still unresolved.
pub struct StaleReminder;

impl ReminderVariant for StaleReminder {
    const NAME: &'static str = "stale-reminder";
    const REMINDER_TYPE: &'static str = "stale";
    const DEFAULT_TEMPLATE_NAME: &'static str = "stale_reminder.txt";
    const DEFAULT_TEMPLATE: &'static str = DEFAULT_STALE_REMINDER_TEMPLATE;

    fn is_candidate(ticket: &Ticket) -> bool {
        !ticket.assignees().is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ReminderSettings {
    delay: DurationSpec,
    #[serde(default)]
    snooze_labels: Map<String, Value>,
    #[serde(default)]
    notify: Vec<String>,
    #[serde(default)]
    reset_label: Option<String>,
    #[serde(default)]
    template: Option<PathBuf>,
    #[serde(default)]
    email_ticket_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnoozeLabel {
    pub name: String,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct ReminderConfig {
    pub delay: Duration,
    /// In configuration order; the first one present on a ticket wins.
    pub snooze_labels: Vec<SnoozeLabel>,
    pub notify: Vec<String>,
    pub marker_label: Option<String>,
    pub template: TextTemplate,
}

pub struct ReminderTask<V>(PhantomData<V>);

impl<V: ReminderVariant> Workflow for ReminderTask<V> {
    const NAME: &'static str = V::NAME;
    type Config = ReminderConfig;

    fn build_config(
        settings: &Map<String, Value>,
        _context: &TaskContext<'_>,
    ) -> Result<Self::Config, ConfigError> {
        build_reminder_config(
            V::NAME,
            settings,
            V::DEFAULT_TEMPLATE_NAME,
            V::DEFAULT_TEMPLATE,
        )
    }

    fn execute(config: &Self::Config, context: &TaskContext<'_>, dry: bool) -> Result<TaskOutcome> {
        let tickets = context
            .bot
            .list_email_originated_tickets(TicketState::Open)
            .context("failed to list open email tickets")?;
        let candidates = tickets
            .iter()
            .filter(|ticket| ticket.is_trackable() && V::is_candidate(ticket))
            .collect::<Vec<_>>();
        context.sink.debug(&format!(
            "{}: {} of {} open tickets are candidates",
            V::NAME,
            candidates.len(),
            tickets.len()
        ));

        let mut failures = 0usize;
        let mut warned_unmarked = false;
        for ticket in candidates {
            match remind_ticket(ticket, config, V::REMINDER_TYPE, context, dry) {
                Ok(true) if config.marker_label.is_none() && !warned_unmarked => {
                    warned_unmarked = true;
                    context.sink.warning(&format!(
                        "{}: no snooze labels configured; reminders will repeat on every run",
                        V::NAME
                    ));
                }
                Ok(_) => {}
                Err(error) => {
                    failures += 1;
                    context.sink.error(&format!(
                        "failed to remind ticket #{}: {error:#}",
                        ticket.number()
                    ));
                }
            }
        }

        if failures > 0 {
            return Ok(TaskOutcome::Failed);
        }
        Ok(TaskOutcome::Completed)
    }
}

pub fn build_reminder_config(
    workflow: &str,
    settings: &Map<String, Value>,
    default_template_name: &str,
    default_template: &str,
) -> Result<ReminderConfig, ConfigError> {
    let settings: ReminderSettings = settings_from_map(workflow, settings)?;
    if settings.email_ticket_only == Some(false) {
        return Err(ConfigError::workflow(
            workflow,
            "email-ticket-only: false is not supported; only email tickets are tracked",
        ));
    }
    let delay = duration_setting(workflow, "delay", &settings.delay)?;

    let mut snooze_labels = Vec::with_capacity(settings.snooze_labels.len());
    for (name, raw) in &settings.snooze_labels {
        let spec: DurationSpec = serde_json::from_value(raw.clone()).map_err(|error| {
            ConfigError::workflow(workflow, format!("snooze label '{name}': {error}"))
        })?;
        let key = format!("snooze-labels.{name}");
        snooze_labels.push(SnoozeLabel {
            name: name.clone(),
            duration: duration_setting(workflow, &key, &spec)?,
        });
    }

    let marker_label = match settings.reset_label {
        Some(label) => {
            if !snooze_labels.iter().any(|snooze| snooze.name == label) {
                return Err(ConfigError::workflow(
                    workflow,
                    format!("reset-label '{label}' is not one of the snooze labels"),
                ));
            }
            Some(label)
        }
        None => snooze_labels.first().map(|snooze| snooze.name.clone()),
    };

    let template = TextTemplate::load_or_default(
        settings.template.as_deref(),
        default_template_name,
        default_template,
    )?;

    Ok(ReminderConfig {
        delay,
        snooze_labels,
        notify: settings.notify,
        marker_label,
        template,
    })
}

/// Time at which `ticket` becomes due for a reminder.
pub fn reminder_anchor<H>(
    ticket: &Ticket,
    delay: Duration,
    snooze_labels: &[SnoozeLabel],
    history: &H,
) -> Result<DateTime<Utc>>
where
    H: LabelHistory + ?Sized,
{
    let Some(snooze) = snooze_labels
        .iter()
        .find(|snooze| ticket.has_label(&snooze.name))
    else {
        return Ok(ticket.date_created() + delay);
    };
    let added = history
        .label_added(ticket, &snooze.name)
        .with_context(|| format!("failed to read history of label '{}'", snooze.name))?;
    Ok(match added {
        Some(added) => added + snooze.duration,
        None => ticket.date_created() + delay,
    })
}

/// Logins to mention, in configured order without duplicates.
pub fn resolve_recipients(notify: &[String], ticket: &Ticket, team: &[TeamMember]) -> Vec<String> {
    let mut logins: Vec<String> = Vec::new();
    let mut push = |login: &str| {
        let login = login.trim().trim_start_matches('@');
        if !login.is_empty() && !logins.iter().any(|known| known.eq_ignore_ascii_case(login)) {
            logins.push(login.to_string());
        }
    };
    for entry in notify {
        let entry = entry.trim();
        if entry.eq_ignore_ascii_case(NOTIFY_ASSIGNEES) {
            ticket.assignees().iter().for_each(|login| push(login));
            continue;
        }
        match team.iter().find(|member| member.matches_reference(entry)) {
            Some(member) => {
                if let Some(login) = member.github.as_deref() {
                    push(login);
                }
            }
            None => push(entry),
        }
    }
    logins
}

pub fn format_mentions(logins: &[String]) -> String {
    logins
        .iter()
        .map(|login| format!("@{login}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Evaluates one ticket and posts its reminder when due. Returns whether the
/// reminder was due.
pub fn remind_ticket(
    ticket: &Ticket,
    config: &ReminderConfig,
    reminder_type: &str,
    context: &TaskContext<'_>,
    dry: bool,
) -> Result<bool> {
    let anchor = reminder_anchor(ticket, config.delay, &config.snooze_labels, context.bot)?;
    if !is_due_at(anchor, context.now) {
        context.sink.debug(&format!(
            "ticket #{} not due until {}",
            ticket.number(),
            anchor.to_rfc3339()
        ));
        return Ok(false);
    }

    let recipients = resolve_recipients(&config.notify, ticket, context.team);
    let comment = config.template.render(context! {
        notify => format_mentions(&recipients),
        reminder_type => reminder_type,
        ticket_number => ticket.number(),
        ticket_url => ticket.url(),
    })?;
    context
        .sink
        .info(&format!("CREATING COMMENT on ticket #{}", ticket.number()));
    context
        .sink
        .info(&format!("COMMENT CONTENTS:\n{comment}"));
    if dry {
        return Ok(true);
    }

    context
        .bot
        .make_comment(ticket, &comment)
        .context("failed to post reminder comment")?;
    if let Some(label) = config.marker_label.as_deref() {
        // The anchor follows the first configured snooze label present, so any
        // other snooze label would shadow the fresh marker.
        for stale in config
            .snooze_labels
            .iter()
            .filter(|snooze| snooze.name != label && ticket.has_label(&snooze.name))
        {
            context
                .bot
                .remove_label(ticket, &stale.name)
                .with_context(|| format!("failed to remove label '{}'", stale.name))?;
        }
        context
            .bot
            .add_label(ticket, label)
            .with_context(|| format!("failed to add label '{label}'"))?;
    }
    Ok(true)
}
