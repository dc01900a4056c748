//! Uniform authorization validation for credentialed collaborators.
//!
//! Each collaborator declares which of its own errors mean "the credentials
//! were refused". [`validate_authorization`] turns those into `false` plus a
//! pair of critical records; every other error still propagates.

use crate::log_sink::LogSink;

/// Capability implemented by every collaborator that holds credentials.
pub trait AuthorizationCheck {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Performs exactly one provider-specific verification.
    fn check_authorization(&self) -> Result<bool, Self::Error>;

    /// Returns the failure kind when `error` is a declared authorization
    /// failure, `None` for errors that must propagate.
    fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str>;

    fn authorization_label(&self) -> String {
        short_type_name::<Self>().to_string()
    }
}

/// Runs the collaborator's check, mapping declared failures to `Ok(false)`.
///
/// On a declared failure with a sink present, exactly two critical records
/// are emitted: `"<label>: Authorization failed"` and `"<kind>: <message>"`.
pub fn validate_authorization<C>(
    collaborator: &C,
    sink: Option<&dyn LogSink>,
    label: Option<&str>,
) -> Result<bool, C::Error>
where
    C: AuthorizationCheck + ?Sized,
{
    match collaborator.check_authorization() {
        Ok(authorized) => Ok(authorized),
        Err(error) => {
            let Some(kind) = C::authorization_failure_kind(&error) else {
                return Err(error);
            };
            if let Some(sink) = sink {
                let label = label
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| collaborator.authorization_label());
                sink.critical(&format!("{label}: Authorization failed"));
                sink.critical(&format!("{kind}: {error}"));
            }
            Ok(false)
        }
    }
}

/// Object-safe view of [`AuthorizationCheck`], used where collaborators are
/// held as trait objects.
pub trait Authorizable {
    fn validate_authorization(
        &self,
        sink: Option<&dyn LogSink>,
        label: Option<&str>,
    ) -> anyhow::Result<bool>;
}

impl<T> Authorizable for T
where
    T: AuthorizationCheck,
{
    fn validate_authorization(
        &self,
        sink: Option<&dyn LogSink>,
        label: Option<&str>,
    ) -> anyhow::Result<bool> {
        validate_authorization(self, sink, label).map_err(anyhow::Error::new)
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use thiserror::Error;

    use super::{validate_authorization, Authorizable, AuthorizationCheck};
    use crate::log_sink::{CapturingSink, Severity};

    #[derive(Debug, Error)]
    enum ProbeError {
        #[error("token rejected")]
        Rejected,
        #[error("socket closed")]
        Transport,
    }

    struct ScriptedProbe {
        outcome: fn() -> Result<bool, ProbeError>,
        calls: Cell<usize>,
    }

    impl ScriptedProbe {
        fn new(outcome: fn() -> Result<bool, ProbeError>) -> Self {
            Self {
                outcome,
                calls: Cell::new(0),
            }
        }
    }

    impl AuthorizationCheck for ScriptedProbe {
        type Error = ProbeError;

        fn check_authorization(&self) -> Result<bool, Self::Error> {
            self.calls.set(self.calls.get() + 1);
            (self.outcome)()
        }

        fn authorization_failure_kind(error: &Self::Error) -> Option<&'static str> {
            match error {
                ProbeError::Rejected => Some("Rejected"),
                ProbeError::Transport => None,
            }
        }
    }

    #[test]
    fn unit_validate_authorization_returns_true_without_logging() {
        let sink = CapturingSink::new();
        let probe = ScriptedProbe::new(|| Ok(true));
        let outcome = validate_authorization(&probe, Some(&sink), None).expect("validate");
        assert!(outcome);
        assert_eq!(probe.calls.get(), 1);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn functional_declared_failure_logs_one_critical_pair() {
        let sink = CapturingSink::new();
        let probe = ScriptedProbe::new(|| Err(ProbeError::Rejected));
        let outcome =
            validate_authorization(&probe, Some(&sink), Some("Bot SMTP")).expect("validate");
        assert!(!outcome);

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|record| record.severity == Severity::Critical));
        assert_eq!(records[0].message, "Bot SMTP: Authorization failed");
        assert_eq!(records[1].message, "Rejected: token rejected");
    }

    #[test]
    fn unit_label_defaults_to_type_name() {
        let sink = CapturingSink::new();
        let probe = ScriptedProbe::new(|| Err(ProbeError::Rejected));
        validate_authorization(&probe, Some(&sink), None).expect("validate");
        assert_eq!(
            sink.records()[0].message,
            "ScriptedProbe: Authorization failed"
        );
    }

    #[test]
    fn regression_undeclared_errors_propagate() {
        let sink = CapturingSink::new();
        let probe = ScriptedProbe::new(|| Err(ProbeError::Transport));
        let error = validate_authorization(&probe, Some(&sink), None).expect_err("propagates");
        assert!(matches!(error, ProbeError::Transport));
        assert!(sink.records().is_empty());
    }

    #[test]
    fn unit_missing_sink_suppresses_logging() {
        let probe = ScriptedProbe::new(|| Err(ProbeError::Rejected));
        assert!(!validate_authorization(&probe, None, None).expect("validate"));
    }

    #[test]
    fn integration_authorizable_object_wraps_undeclared_errors() {
        let probe = ScriptedProbe::new(|| Err(ProbeError::Transport));
        let authorizable: &dyn Authorizable = &probe;
        let error = authorizable
            .validate_authorization(None, None)
            .expect_err("transport error");
        assert!(error.to_string().contains("socket closed"));
    }
}
