use anyhow::{Context, Result};
use ticbot_core::LogSink;
use ticbot_tasks::{
    find_workflow, load_config_file, registered_workflow_names, ConfigFile, TaskContext,
    TaskOutcome, WORKFLOWS,
};

use crate::cli_args::{dry_override, Cli, CliCommand};
use crate::runtime_setup::Collaborators;

pub(crate) fn execute_cli(cli: &Cli, sink: &dyn LogSink) -> Result<bool> {
    match &cli.command {
        CliCommand::Workflows => {
            for name in registered_workflow_names() {
                println!("{name}");
            }
            Ok(true)
        }
        CliCommand::CheckConfig => {
            let config = load_config_file(&cli.config)?;
            let collaborators = Collaborators::from_config(&config)?;
            let configured = check_config(&config, &collaborators.task_context(sink))?;
            println!(
                "{}: ok ({} active workflows: {})",
                cli.config.display(),
                configured.len(),
                configured.join(", ")
            );
            Ok(true)
        }
        CliCommand::Run {
            workflows,
            dry_run,
            live,
        } => {
            let config = load_config_file(&cli.config)?;
            let collaborators = Collaborators::from_config(&config)?;
            let context = collaborators.task_context(sink);
            Ok(run_workflows(
                &config,
                workflows,
                &context,
                dry_override(*dry_run, *live),
            ))
        }
    }
}

/// Builds every configured workflow. Returns the active ones.
pub(crate) fn check_config(
    config: &ConfigFile,
    context: &TaskContext<'_>,
) -> Result<Vec<&'static str>> {
    for name in config.workflows.keys() {
        find_workflow(name)?;
    }
    let mut active = Vec::new();
    for workflow in WORKFLOWS {
        let configured = (workflow.check)(config.workflow_value(workflow.name), context)
            .with_context(|| format!("invalid configuration for {}", workflow.name))?;
        if configured {
            active.push(workflow.name);
        }
    }
    Ok(active)
}

/// Runs each workflow in order; one failure does not stop the rest.
/// Returns false when any workflow failed or errored.
pub(crate) fn run_workflows(
    config: &ConfigFile,
    names: &[String],
    context: &TaskContext<'_>,
    dry_override: Option<bool>,
) -> bool {
    let mut success = true;
    for name in names {
        let result = find_workflow(name)
            .map_err(anyhow::Error::from)
            .and_then(|workflow| {
                (workflow.run)(config.workflow_value(workflow.name), context, dry_override)
            });
        match result {
            Ok(TaskOutcome::Failed) => success = false,
            Ok(_) => {}
            Err(error) => {
                success = false;
                context.sink.error(&format!("{name}: {error:#}"));
            }
        }
    }
    success
}
