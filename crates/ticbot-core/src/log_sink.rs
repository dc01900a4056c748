use std::fmt;
use std::sync::Mutex;

/// Severity attached to every record emitted through a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for operator-facing records produced by workflow operations.
///
/// Workflows never reach for a process-wide logger; the sink is handed to
/// each operation so dry-run and live output can be captured and compared.
pub trait LogSink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.emit(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }

    fn warning(&self, message: &str) {
        self.emit(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }

    fn critical(&self, message: &str) {
        self.emit(Severity::Critical, message);
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Forwards records to the `tracing` subscriber installed at startup.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!("{message}"),
            Severity::Info => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
            Severity::Critical => tracing::error!(critical = true, "{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Default)]
/// Keeps every record in memory, in emission order.
pub struct CapturingSink {
    records: Mutex<Vec<LogRecord>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn records_at(&self, severity: Severity) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.severity == severity)
            .collect()
    }

    /// All messages joined by newlines, for marker assertions.
    pub fn text(&self) -> String {
        self.records()
            .iter()
            .map(|record| record.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.lock() {
            records.clear();
        }
    }
}

impl LogSink for CapturingSink {
    fn emit(&self, severity: Severity, message: &str) {
        if let Ok(mut records) = self.records.lock() {
            records.push(LogRecord {
                severity,
                message: message.to_string(),
            });
        }
    }
}
