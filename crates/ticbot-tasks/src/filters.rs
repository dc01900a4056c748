//! Message filters applied before reconciliation.
//!
//! A filter answers "exclude this message?". Filters are registered by name
//! in [`FILTERS`] and built once per task run from the workflow's `filters`
//! list; inactive entries are skipped at build time.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};
use ticbot_core::{header_mentions_address, Message, TeamMember};

use crate::config::ConfigError;

pub type MessageFilter = Box<dyn Fn(&Message) -> bool + Send + Sync>;

/// What a filter may look at while it is being built.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub mailbox_address: &'a str,
    pub outgoing_address: Option<&'a str>,
    pub team: &'a [TeamMember],
}

pub type FilterBuilder =
    fn(&FilterContext<'_>, &Map<String, Value>) -> Result<MessageFilter, ConfigError>;

pub const FILTERS: &[(&str, FilterBuilder)] = &[
    ("bot", message_from_bot),
    ("team", message_from_team_not_to_inbox),
];

pub fn registered_filter_names() -> Vec<&'static str> {
    FILTERS.iter().map(|(name, _)| *name).collect()
}

#[derive(Debug, Clone, Deserialize)]
/// One entry of a workflow's `filters` list.
pub struct FilterSpec {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

fn default_active() -> bool {
    true
}

/// Excludes mail sent by the bot's own outgoing channel.
fn message_from_bot(
    context: &FilterContext<'_>,
    _params: &Map<String, Value>,
) -> Result<MessageFilter, ConfigError> {
    let bot_address = context.outgoing_address.map(str::to_string);
    Ok(Box::new(move |message: &Message| {
        bot_address
            .as_deref()
            .is_some_and(|address| header_mentions_address(message.from_header(), address))
    }))
}

/// Excludes team cross-talk that was not addressed to the shared inbox.
fn message_from_team_not_to_inbox(
    context: &FilterContext<'_>,
    _params: &Map<String, Value>,
) -> Result<MessageFilter, ConfigError> {
    let team_addresses = context
        .team
        .iter()
        .map(|member| member.email.clone())
        .collect::<Vec<_>>();
    let inbox_address = context.mailbox_address.to_string();
    Ok(Box::new(move |message: &Message| {
        let from_team = team_addresses
            .iter()
            .any(|address| header_mentions_address(message.from_header(), address));
        from_team && !header_mentions_address(message.to_header(), &inbox_address)
    }))
}

/// Active filters, evaluated in configured order with short-circuit OR.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<(String, MessageFilter)>,
}

impl FilterChain {
    pub fn build(specs: &[FilterSpec], context: &FilterContext<'_>) -> Result<Self, ConfigError> {
        let mut filters = Vec::new();
        for spec in specs.iter().filter(|spec| spec.active) {
            let (_, builder) = FILTERS
                .iter()
                .find(|(name, _)| *name == spec.name.trim())
                .ok_or_else(|| ConfigError::UnknownFilter {
                    name: spec.name.clone(),
                    known: registered_filter_names().join(", "),
                })?;
            filters.push((spec.name.trim().to_string(), builder(context, &spec.params)?));
        }
        Ok(Self { filters })
    }

    pub fn push(&mut self, name: impl Into<String>, filter: MessageFilter) {
        self.filters.push((name.into(), filter));
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn excludes(&self, message: &Message) -> bool {
        self.filters.iter().any(|(_, filter)| filter(message))
    }

    /// Drops the leading run of excluded messages only. Once a message
    /// survives, every later message is kept whether or not a filter would
    /// exclude it.
    pub fn drop_leading_excluded(&self, messages: Vec<Message>) -> Vec<Message> {
        messages
            .into_iter()
            .skip_while(|message| self.excludes(message))
            .collect()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
