use anyhow::{Context, Result};
use ticbot_core::{LogSink, Mailbox, OutgoingMail, SecretSource, TeamMember};
use ticbot_github::{GithubBot, GithubBotConfig};
use ticbot_mail::{
    build_mailbox, MailboxSettings, SmtpChannel, SmtpChannelConfig, DEFAULT_SMTP_PORT,
};
use ticbot_tasks::config::{BotConfig, InboxConfig, SmtpConfig};
use ticbot_tasks::{ConfigFile, TaskContext};

/// Collaborators built once per process from the `config` section.
pub(crate) struct Collaborators {
    pub mailbox: Box<dyn Mailbox>,
    pub bot: GithubBot,
    pub outgoing: Option<SmtpChannel>,
    pub team: Vec<TeamMember>,
}

impl Collaborators {
    pub fn from_config(config: &ConfigFile) -> Result<Self> {
        let mailbox = build_mailbox(&mailbox_settings(&config.config.inbox))
            .context("failed to configure inbox")?;
        let bot =
            GithubBot::new(bot_config(&config.config.bot)).context("failed to configure bot")?;
        let outgoing = config
            .config
            .bot
            .smtp
            .as_ref()
            .map(|smtp| SmtpChannel::new(smtp_config(smtp)))
            .transpose()
            .context("failed to configure SMTP channel")?;
        Ok(Self {
            mailbox,
            bot,
            outgoing,
            team: config.team(),
        })
    }

    pub fn task_context<'a>(&'a self, sink: &'a dyn LogSink) -> TaskContext<'a> {
        TaskContext::new(
            self.mailbox.as_ref(),
            &self.bot,
            self.outgoing.as_ref().map(|channel| channel as &dyn OutgoingMail),
            &self.team,
            sink,
        )
    }
}

pub(crate) fn mailbox_settings(inbox: &InboxConfig) -> MailboxSettings {
    MailboxSettings {
        kind: inbox.kind.clone(),
        user: inbox.user.clone(),
        secret: SecretSource::env(inbox.secret.clone()),
        host: inbox.host.clone(),
        port: inbox.port,
        folder: inbox.folder.clone(),
    }
}

pub(crate) fn bot_config(bot: &BotConfig) -> GithubBotConfig {
    let mut config = GithubBotConfig::new(
        bot.repo.clone(),
        SecretSource::env(bot.token_secret.clone()),
    );
    if let Some(api_base) = bot.api_base.as_ref() {
        config.api_base = api_base.clone();
    }
    if let Some(timeout) = bot.request_timeout_ms {
        config.request_timeout_ms = timeout;
    }
    if let Some(attempts) = bot.retry_max_attempts {
        config.retry_max_attempts = attempts;
    }
    if let Some(delay) = bot.retry_base_delay_ms {
        config.retry_base_delay_ms = delay;
    }
    config.ticket_labels = bot.ticket_labels.clone();
    config
}

pub(crate) fn smtp_config(smtp: &SmtpConfig) -> SmtpChannelConfig {
    SmtpChannelConfig {
        host: smtp.host.clone(),
        port: smtp.port.unwrap_or(DEFAULT_SMTP_PORT),
        user: smtp.user.clone(),
        secret: SecretSource::env(smtp.secret.clone()),
    }
}
