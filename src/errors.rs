use std::path::PathBuf;

/// Errors that abort a poll cycle or a run.
///
/// Threshold breaches are not errors: they are `Fail` verdicts recorded in the
/// report.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// A local metrics source cannot be read or parsed
    #[error("{metric} source unavailable: {reason}")]
    SourceUnavailable { metric: String, reason: String },
    /// The report log cannot be opened or written
    #[error("cannot write report to {}: {reason}", path.display())]
    ReportDestination { path: PathBuf, reason: String },
    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),
}

impl HealthError {
    pub fn source_unavailable(metric: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            metric: metric.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while delivering an alert. Never escalated past a log line.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// No recipient configured, or no mail tool on the host
    #[error("notification unavailable: {0}")]
    Unavailable(String),
    /// The mail tool ran but did not accept the message
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}
