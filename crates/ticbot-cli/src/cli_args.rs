use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "ticbot",
    about = "Turns shared-inbox mail into GitHub issues and reminds the team about them",
    version
)]
/// Public struct `Cli` used across ticbot components.
pub(crate) struct Cli {
    #[arg(
        long,
        env = "TICBOT_CONFIG",
        default_value = "ticbot.yaml",
        help = "Configuration file (.yaml, .yml or .toml)"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Run the named workflows in order.
    Run {
        #[arg(required = true, help = "Workflow names, e.g. emails-to-issues")]
        workflows: Vec<String>,

        #[arg(
            long = "dry-run",
            conflicts_with = "live",
            help = "Log every action without mutating the tracker or sending mail"
        )]
        dry_run: bool,

        #[arg(long, help = "Run live even when the workflow block sets dry: true")]
        live: bool,
    },
    /// Build every configured workflow without touching the network.
    CheckConfig,
    /// List registered workflow names.
    Workflows,
}

/// `--dry-run` forces dry, `--live` forces live, neither defers to config.
pub(crate) fn dry_override(dry_run: bool, live: bool) -> Option<bool> {
    match (dry_run, live) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{dry_override, Cli, CliCommand};

    #[test]
    fn unit_run_parses_workflows_and_flags() {
        let cli = Cli::try_parse_from([
            "ticbot",
            "--config",
            "ops/ticbot.toml",
            "run",
            "emails-to-issues",
            "unassigned-reminder",
            "--dry-run",
        ])
        .expect("parse");
        assert_eq!(cli.config, PathBuf::from("ops/ticbot.toml"));
        match cli.command {
            CliCommand::Run {
                workflows,
                dry_run,
                live,
            } => {
                assert_eq!(workflows, vec!["emails-to-issues", "unassigned-reminder"]);
                assert_eq!(dry_override(dry_run, live), Some(true));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn regression_dry_run_and_live_conflict() {
        assert!(Cli::try_parse_from(["ticbot", "run", "x", "--dry-run", "--live"]).is_err());
        assert!(Cli::try_parse_from(["ticbot", "run"]).is_err());
    }

    #[test]
    fn unit_dry_override_defers_without_flags() {
        assert_eq!(dry_override(false, false), None);
        assert_eq!(dry_override(false, true), Some(false));
    }

    #[test]
    fn unit_check_config_and_workflows_subcommands_parse() {
        let cli = Cli::try_parse_from(["ticbot", "check-config"]).expect("check-config");
        assert!(matches!(cli.command, CliCommand::CheckConfig));
        let cli = Cli::try_parse_from(["ticbot", "workflows"]).expect("workflows");
        assert!(matches!(cli.command, CliCommand::Workflows));
    }
}
