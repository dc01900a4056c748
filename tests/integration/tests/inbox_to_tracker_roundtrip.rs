use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::{json, Value};
use ticbot_core::{
    AuthorizationCheck, CapturingSink, Mailbox, Message, SecretSource, Severity,
};
use ticbot_github::{GithubBot, GithubBotConfig};
use ticbot_tasks::config::parse_yaml_config;
use ticbot_tasks::{
    find_workflow, load_config_file, ConfigFile, TaskContext, TaskOutcome,
};

const CONFIG: &str = r#"
config:
  inbox: {type: gmail, user: help@example.org, secret: INBOX_PASSWORD}
  bot: {repo: acme/help, token-secret: BOT_TOKEN}
team:
  - {name: Alice, email: alice@example.org, github: alice}
workflows:
  emails-to-issues:
    recent: 48h
    filters:
      - {name: team}
  unassigned-reminder:
    cron: "0 15 * * * "
    email-ticket-only: true
    delay: {hours: 2}
    snooze-labels:
      snooze-5-minutes: {minutes: 5}
      snooze-5-hours: {hours: 5}
    notify: [Alice]
"#;

struct ScriptedInbox {
    messages: Vec<Message>,
    fetched_since: Mutex<Vec<DateTime<Utc>>>,
}

impl ScriptedInbox {
    fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            fetched_since: Mutex::new(Vec::new()),
        }
    }
}

impl AuthorizationCheck for ScriptedInbox {
    type Error = std::io::Error;

    fn check_authorization(&self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str> {
        (error.kind() == std::io::ErrorKind::PermissionDenied).then_some("PermissionDenied")
    }
}

impl Mailbox for ScriptedInbox {
    fn own_address(&self) -> &str {
        "help@example.org"
    }

    fn secret_name(&self) -> &str {
        "INBOX_PASSWORD"
    }

    fn fetch_recent_messages(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Message>> {
        self.fetched_since
            .lock()
            .expect("fetch log lock")
            .push(since);
        Ok(self.messages.clone())
    }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn message(id: &str, from: &str, to: &str, subject: &str) -> Message {
    Message::new(id, at(8, 0))
        .with_subject(subject)
        .with_content(format!("{subject}\n\ncc @alice"))
        .with_header("From", from)
        .with_header("To", to)
}

fn bot_for(server: &MockServer) -> GithubBot {
    let mut config =
        GithubBotConfig::new("acme/help", SecretSource::Literal("test-token".into()));
    config.api_base = server.url("");
    config.retry_base_delay_ms = 1;
    GithubBot::new(config).expect("bot")
}

fn issue(number: u64, body: &str, created_at: &str, labels: &[&str]) -> Value {
    json!({
        "number": number,
        "title": format!("Ticket {number}"),
        "body": body,
        "html_url": format!("https://github.com/acme/help/issues/{number}"),
        "created_at": created_at,
        "assignees": [],
        "labels": labels.iter().map(|name| json!({"name": name})).collect::<Vec<_>>(),
    })
}

fn run(config: &ConfigFile, name: &str, context: &TaskContext<'_>, dry: bool) -> TaskOutcome {
    let workflow = find_workflow(name).expect("registered workflow");
    (workflow.run)(config.workflow_value(name), context, Some(dry)).expect("workflow run")
}

#[test]
fn integration_new_mail_becomes_one_github_issue() {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/help/issues")
            .query_param("state", "all")
            .header("authorization", "Bearer test-token");
        then.status(200).json_body(json!([
            issue(1, "ticket_id: '100'\n---\nalready tracked", "2024-02-28T10:00:00Z", &[]),
            issue(2, "filed by hand", "2024-02-28T11:00:00Z", &[]),
        ]));
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/help/issues")
            .body_includes("ticket_id: '42'")
            .body_includes("@<!-- -->alice");
        then.status(201).json_body(issue(
            3,
            "ticket_id: '42'\n---\nPrinter on fire",
            "2024-03-01T10:00:00Z",
            &[],
        ));
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ticbot.yaml");
    std::fs::write(&path, CONFIG).expect("write config");
    let config = load_config_file(&path).expect("config");
    let team = config.team();

    let inbox = ScriptedInbox::new(vec![
        message("100", "customer@example.com", "help@example.org", "Old"),
        message("42", "Customer <customer@example.com>", "help@example.org", "Printer on fire"),
    ]);
    let bot = bot_for(&server);
    let sink = CapturingSink::new();
    let context = TaskContext::new(&inbox, &bot, None, &team, &sink).with_now(at(10, 0));

    assert_eq!(run(&config, "emails-to-issues", &context, false), TaskOutcome::Completed);
    list.assert_calls(1);
    create.assert_calls(1);
    assert_eq!(
        inbox.fetched_since.lock().expect("fetch log").as_slice(),
        &[at(10, 0) - chrono::Duration::hours(48)]
    );
    assert!(sink.text().contains("CREATED ISSUE #3"));
}

#[test]
fn integration_dry_run_reads_but_never_writes() {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/help/issues");
        then.status(200).json_body(json!([]));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/repos/acme/help/issues");
        then.status(201).json_body(json!({}));
    });

    let config = parse_yaml_config(CONFIG).expect("config");
    let team = config.team();
    let inbox = ScriptedInbox::new(vec![
        message("7", "Alice <alice@example.org>", "bob@example.org", "internal"),
        message("8", "customer@example.com", "help@example.org", "Refund"),
    ]);
    let bot = bot_for(&server);
    let sink = CapturingSink::new();
    let context = TaskContext::new(&inbox, &bot, None, &team, &sink).with_now(at(10, 0));

    assert_eq!(run(&config, "emails-to-issues", &context, true), TaskOutcome::Completed);
    list.assert_calls(1);
    create.assert_calls(0);
    let text = sink.text();
    assert!(text.contains("CREATING ISSUE\ntitle: Refund"));
    assert!(!text.contains("title: internal"));
}

#[test]
fn integration_reminder_fires_after_snooze_and_resets_the_label() {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/help/issues")
            .query_param("state", "open");
        then.status(200).json_body(json!([issue(
            5,
            "ticket_id: '55'\n---\nHelp",
            "2024-03-01T00:00:00Z",
            &["snooze-5-minutes"],
        )]));
    });
    let events = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/help/issues/5/events");
        then.status(200).json_body(json!([
            {"event": "labeled", "created_at": "2024-03-01T11:00:00Z", "label": {"name": "snooze-5-minutes"}},
            {"event": "assigned", "created_at": "2024-03-01T11:01:00Z"}
        ]));
    });
    let comment = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/help/issues/5/comments")
            .body_includes("@alice: ticket #5 is still unassigned");
        then.status(201).json_body(json!({"id": 1}));
    });
    let unlabel = server.mock(|when, then| {
        when.method(DELETE)
            .path("/repos/acme/help/issues/5/labels/snooze-5-minutes");
        then.status(200).json_body(json!([]));
    });
    let relabel = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/help/issues/5/labels")
            .json_body(json!({"labels": ["snooze-5-minutes"]}));
        then.status(200).json_body(json!([{"name": "snooze-5-minutes"}]));
    });

    let config = parse_yaml_config(CONFIG).expect("config");
    let team = config.team();
    let inbox = ScriptedInbox::new(Vec::new());
    let bot = bot_for(&server);

    let quiet_sink = CapturingSink::new();
    let quiet = TaskContext::new(&inbox, &bot, None, &team, &quiet_sink).with_now(at(11, 4));
    assert_eq!(run(&config, "unassigned-reminder", &quiet, false), TaskOutcome::Completed);
    assert!(!quiet_sink.text().contains("CREATING COMMENT"));
    comment.assert_calls(0);

    let sink = CapturingSink::new();
    let due = TaskContext::new(&inbox, &bot, None, &team, &sink).with_now(at(11, 6));
    assert_eq!(run(&config, "unassigned-reminder", &due, false), TaskOutcome::Completed);
    list.assert_calls(2);
    events.assert_calls(2);
    comment.assert_calls(1);
    unlabel.assert_calls(1);
    relabel.assert_calls(1);
    assert!(sink.records_at(Severity::Error).is_empty());
}

#[test]
fn integration_rejected_token_fails_the_authorization_check() {
    let server = MockServer::start();
    let repo = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/help");
        then.status(401).json_body(json!({"message": "Bad credentials"}));
    });

    let config = parse_yaml_config(
        "config:\n  \
         inbox: {type: gmail, user: help@example.org, secret: INBOX_PASSWORD}\n  \
         bot: {repo: acme/help, token-secret: BOT_TOKEN}\n\
         workflows:\n  authorization-check: {active: true}\n",
    )
    .expect("config");
    let inbox = ScriptedInbox::new(Vec::new());
    let bot = bot_for(&server);
    let sink = CapturingSink::new();
    let context =
        TaskContext::new(&inbox, &bot, None, &[], &sink).with_secret_probe(|_| true);

    assert_eq!(run(&config, "authorization-check", &context, false), TaskOutcome::Failed);
    repo.assert_calls(1);
    let critical = sink.records_at(Severity::Critical);
    assert_eq!(critical.len(), 2);
    assert_eq!(critical[0].message, "Bot: Authorization failed");
    assert!(critical[1].message.starts_with("Unauthorized: "));
    assert_eq!(
        sink.records_at(Severity::Warning)[0].message,
        "No SMTP secret defined; sendmail not possible"
    );
}
