use std::fmt;

/// Where a collaborator reads its credential from.
///
/// Configuration only ever names environment variables; literals exist for
/// tests and embedding.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretSource {
    Env(String),
    Literal(String),
}

impl SecretSource {
    pub fn env(name: impl Into<String>) -> Self {
        Self::Env(name.into())
    }

    /// Name reported in diagnostics; never the secret itself.
    pub fn name(&self) -> &str {
        match self {
            Self::Env(name) => name,
            Self::Literal(_) => "<literal>",
        }
    }

    /// Resolved value, `None` when missing or blank.
    pub fn resolve(&self) -> Option<String> {
        let value = match self {
            Self::Env(name) => std::env::var(name).ok()?,
            Self::Literal(value) => value.clone(),
        };
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
            Self::Literal(_) => f.write_str("Literal(<redacted>)"),
        }
    }
}
