use anyhow::Result;
use serde_json::{Map, Value};
use ticbot_core::{Authorizable, LogSink};

use crate::config::ConfigError;
use crate::task_runtime::{SecretProbe, TaskContext, TaskOutcome, Workflow};

pub const BOT_LABEL: &str = "Bot";
pub const SMTP_LABEL: &str = "Bot SMTP";
pub const INBOX_LABEL: &str = "Inbox";

/// Verifies every configured credential: bot, outgoing mail, then inbox.
pub struct AuthorizationCheckTask;

#[derive(Debug)]
pub struct AuthorizationCheckConfig;

impl Workflow for AuthorizationCheckTask {
    const NAME: &'static str = "authorization-check";
    type Config = AuthorizationCheckConfig;

    fn build_config(
        settings: &Map<String, Value>,
        _context: &TaskContext<'_>,
    ) -> Result<Self::Config, ConfigError> {
        if let Some(key) = settings.keys().next() {
            return Err(ConfigError::workflow(
                Self::NAME,
                format!("unknown key '{key}'"),
            ));
        }
        Ok(AuthorizationCheckConfig)
    }

    fn execute(
        _config: &Self::Config,
        context: &TaskContext<'_>,
        _dry: bool,
    ) -> Result<TaskOutcome> {
        let valid_bot = check_collaborator(
            context.bot,
            context.bot.token_secret(),
            BOT_LABEL,
            context,
        )?;
        let valid_smtp = match context.outgoing {
            Some(outgoing) => {
                check_collaborator(outgoing, outgoing.secret_name(), SMTP_LABEL, context)?
            }
            None => {
                context
                    .sink
                    .warning("No SMTP secret defined; sendmail not possible");
                true
            }
        };
        let valid_inbox = check_collaborator(
            context.mailbox,
            context.mailbox.secret_name(),
            INBOX_LABEL,
            context,
        )?;

        if valid_bot && valid_smtp && valid_inbox {
            context.sink.info("All credentials validated");
            Ok(TaskOutcome::Completed)
        } else {
            Ok(TaskOutcome::Failed)
        }
    }
}

fn check_collaborator<C>(
    collaborator: &C,
    secret_name: &str,
    label: &str,
    context: &TaskContext<'_>,
) -> Result<bool>
where
    C: Authorizable + ?Sized,
{
    if !secret_exists(secret_name, context.secret_present, context.sink) {
        return Ok(false);
    }
    collaborator.validate_authorization(Some(context.sink), Some(label))
}

/// Logs one critical record naming the variable when the secret is missing.
pub fn secret_exists(secret_name: &str, probe: SecretProbe, sink: &dyn LogSink) -> bool {
    let present = probe(secret_name);
    if !present {
        sink.critical(&format!(
            "Missing environment variable ${secret_name}.\n\
             Likely causes:\n \
             * GitHub secret of that name missing\n \
             * Spelling mismatch between the config name and the GitHub secret"
        ));
    }
    present
}
