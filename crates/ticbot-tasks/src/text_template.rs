use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::config::ConfigError;

pub const DEFAULT_REPLY_TEMPLATE: &str = include_str!("../templates/email_reply.txt");
pub const DEFAULT_UNASSIGNED_REMINDER_TEMPLATE: &str =
    include_str!("../templates/unassigned_reminder.txt");
pub const DEFAULT_STALE_REMINDER_TEMPLATE: &str = include_str!("../templates/stale_reminder.txt");

/// A minijinja template validated when configuration is built.
///
/// Undefined variables are errors, so a typo in a custom template fails the
/// first render instead of producing a blank.
#[derive(Clone)]
pub struct TextTemplate {
    name: String,
    source: String,
}

impl TextTemplate {
    pub fn from_source(
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let template = Self {
            name: name.into(),
            source: source.into(),
        };
        let environment = template.environment();
        environment
            .template_from_str(&template.source)
            .map_err(|error| ConfigError::Template {
                name: template.name.clone(),
                message: error.to_string(),
            })?;
        Ok(template)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Template {
            name: path.display().to_string(),
            message: error.to_string(),
        })?;
        Self::from_source(path.display().to_string(), source)
    }

    /// The template at `path` when given, otherwise the embedded default.
    pub fn load_or_default(
        path: Option<&Path>,
        default_name: &str,
        default_source: &str,
    ) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::from_source(default_name, default_source),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render<S: Serialize>(&self, context: S) -> Result<String> {
        let environment = self.environment();
        let template = environment
            .template_from_str(&self.source)
            .with_context(|| format!("failed to compile template {}", self.name))?;
        template
            .render(context)
            .with_context(|| format!("failed to render template {}", self.name))
    }

    fn environment(&self) -> Environment<'static> {
        let mut environment = Environment::new();
        environment.set_undefined_behavior(UndefinedBehavior::Strict);
        environment
    }
}

impl fmt::Debug for TextTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextTemplate").field(&self.name).finish()
    }
}
