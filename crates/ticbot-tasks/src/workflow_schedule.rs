use std::str::FromStr;

use cron::Schedule;

use crate::config::ConfigError;

/// Validates a workflow's informational `cron` field.
///
/// Classic five-field expressions get a leading seconds field so the same
/// strings used by external schedulers are accepted.
pub fn parse_workflow_cron(expression: &str) -> Result<Schedule, ConfigError> {
    let trimmed = expression.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    };
    Schedule::from_str(&normalized).map_err(|error| ConfigError::Cron {
        expression: expression.to_string(),
        message: error.to_string(),
    })
}
