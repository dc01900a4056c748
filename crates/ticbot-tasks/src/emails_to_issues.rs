//! Email-to-ticket reconciliation.
//!
//! Recent messages are matched against every email-originated ticket by
//! identity. Messages without a ticket get one, plus an optional
//! acknowledgment reply to the shared inbox. Every mutation is logged before
//! it happens so a dry run prints the same records as a live one.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use minijinja::context;
use serde::Deserialize;
use serde_json::{Map, Value};
use ticbot_core::{
    reply_subject, ticket_body_from_message, DurationSpec, Message, OutgoingMail, OutgoingReply,
    Ticket, TicketState, DEFAULT_CLEANERS,
};

use crate::config::{duration_setting, settings_from_map, ConfigError};
use crate::filters::{FilterChain, FilterSpec};
use crate::task_runtime::{TaskContext, TaskOutcome, Workflow};
use crate::text_template::{TextTemplate, DEFAULT_REPLY_TEMPLATE};

pub const DEFAULT_RECENT_HOURS: i64 = 48;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct EmailsToIssuesSettings {
    #[serde(default)]
    recent: Option<DurationSpec>,
    #[serde(default)]
    filters: Vec<FilterSpec>,
    #[serde(default)]
    reply_inbox: Option<ReplySettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ReplySettings {
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    template: Option<PathBuf>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug)]
pub struct EmailsToIssuesConfig {
    pub recent: Duration,
    pub filters: FilterChain,
    pub reply_template: Option<TextTemplate>,
}

pub struct EmailsToIssues;

impl Workflow for EmailsToIssues {
    const NAME: &'static str = "emails-to-issues";
    type Config = EmailsToIssuesConfig;

    fn build_config(
        settings: &Map<String, Value>,
        context: &TaskContext<'_>,
    ) -> Result<Self::Config, ConfigError> {
        let settings: EmailsToIssuesSettings = settings_from_map(Self::NAME, settings)?;
        let recent = match settings.recent.as_ref() {
            Some(spec) => duration_setting(Self::NAME, "recent", spec)?,
            None => Duration::hours(DEFAULT_RECENT_HOURS),
        };
        let filters = FilterChain::build(&settings.filters, &context.filter_context())?;
        let reply_template = match settings.reply_inbox {
            Some(reply) if reply.active => {
                if context.outgoing.is_none() {
                    return Err(ConfigError::workflow(
                        Self::NAME,
                        "reply-inbox is active but config.bot.smtp is not configured",
                    ));
                }
                Some(TextTemplate::load_or_default(
                    reply.template.as_deref(),
                    "email_reply.txt",
                    DEFAULT_REPLY_TEMPLATE,
                )?)
            }
            _ => None,
        };
        Ok(EmailsToIssuesConfig {
            recent,
            filters,
            reply_template,
        })
    }

    fn execute(config: &Self::Config, context: &TaskContext<'_>, dry: bool) -> Result<TaskOutcome> {
        if config.reply_template.is_some() && context.outgoing.is_none() {
            bail!("SMTP must be configured for the bot to send replies");
        }

        let since = context.now - config.recent;
        let messages = context
            .mailbox
            .fetch_recent_messages(since)
            .context("failed to fetch recent messages")?;
        let fetched = messages.len();
        let kept = config.filters.drop_leading_excluded(messages);
        context.sink.debug(&format!(
            "fetched {fetched} messages since {}; {} kept after filters",
            since.to_rfc3339(),
            kept.len()
        ));

        let tickets = context
            .bot
            .list_email_originated_tickets(TicketState::All)
            .context("failed to list email tickets")?;
        let pending = messages_without_tickets(kept, &tickets);
        context
            .sink
            .debug(&format!("{} messages have no ticket yet", pending.len()));

        let mut failures = 0usize;
        for message in &pending {
            let result = message_to_ticket(message, context, dry).and_then(|ticket| {
                match (&config.reply_template, context.outgoing) {
                    (Some(template), Some(outgoing)) => {
                        send_reply(message, &ticket, template, outgoing, context, dry)
                    }
                    _ => Ok(()),
                }
            });
            if let Err(error) = result {
                failures += 1;
                context.sink.error(&format!(
                    "failed to process message {}: {error:#}",
                    message.unique_id()
                ));
            }
        }

        if failures > 0 {
            return Ok(TaskOutcome::Failed);
        }
        Ok(TaskOutcome::Completed)
    }
}

/// Messages whose identity has no ticket, in fetch order.
///
/// Within the message set a repeated identity keeps the last message at the
/// position of the first.
pub fn messages_without_tickets(messages: Vec<Message>, tickets: &[Ticket]) -> Vec<Message> {
    let known = tickets
        .iter()
        .filter_map(|ticket| ticket.identity().as_present().map(str::to_string))
        .collect::<HashSet<_>>();

    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Message> = Vec::new();
    for message in messages {
        match slots.get(message.unique_id()) {
            Some(&slot) => unique[slot] = message,
            None => {
                slots.insert(message.unique_id().to_string(), unique.len());
                unique.push(message);
            }
        }
    }
    unique
        .into_iter()
        .filter(|message| !known.contains(message.unique_id()))
        .collect()
}

fn message_to_ticket(message: &Message, context: &TaskContext<'_>, dry: bool) -> Result<Ticket> {
    let body = ticket_body_from_message(message, DEFAULT_CLEANERS)
        .context("failed to render ticket body")?;
    context.sink.info(&format!(
        "CREATING ISSUE\ntitle: {}\n{body}",
        message.subject()
    ));
    if dry {
        return Ok(Ticket::null());
    }
    let ticket = context
        .bot
        .create_ticket(message.subject(), &body)
        .context("failed to create ticket")?;
    context
        .sink
        .info(&format!("CREATED ISSUE #{}", ticket.number()));
    Ok(ticket)
}

/// Builds the acknowledgment addressed to the shared inbox.
pub fn build_reply(
    message: &Message,
    ticket: &Ticket,
    template: &TextTemplate,
    from: &str,
    inbox_address: &str,
) -> Result<OutgoingReply> {
    let body = template.render(context! {
        github_url => ticket.url(),
        ticket_url => ticket.url(),
        ticket_number => ticket.number(),
        subject => message.subject(),
    })?;
    Ok(OutgoingReply {
        from: from.to_string(),
        to: vec![inbox_address.to_string()],
        subject: reply_subject(message.subject()),
        body,
        in_reply_to: message.message_id().map(str::to_string),
        thread_topic: message.header("Thread-Topic").map(str::to_string),
    })
}

fn send_reply(
    message: &Message,
    ticket: &Ticket,
    template: &TextTemplate,
    outgoing: &dyn OutgoingMail,
    context: &TaskContext<'_>,
    dry: bool,
) -> Result<()> {
    let inbox_address = context.mailbox.own_address();
    let reply = build_reply(message, ticket, template, outgoing.own_address(), inbox_address)?;
    context
        .sink
        .info(&format!("SENDING EMAIL:\n{}", reply.render()));
    if dry {
        return Ok(());
    }
    outgoing
        .send_reply(&reply, &[inbox_address.to_string()])
        .context("failed to send reply")
}
