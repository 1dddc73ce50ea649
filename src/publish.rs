use crate::errors::HealthError;
use crate::health::HealthReport;
use crate::notify::Notifier;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable, append-only destination for report lines.
pub struct ReportLog {
    path: PathBuf,
}

impl ReportLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, report: &HealthReport) -> Result<(), HealthError> {
        let destination_error = |e: std::io::Error| HealthError::ReportDestination {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(destination_error)?;

        let mut text = report.lines().join("\n");
        text.push('\n');
        file.write_all(text.as_bytes()).map_err(destination_error)?;

        Ok(())
    }
}

/// Hands a finished report to its collaborators: the report log, then the
/// notifier when the report is not OK.
///
/// Only a report log failure is returned. Notification problems are logged
/// and never change the outcome.
pub fn publish(
    report: &HealthReport,
    log: &ReportLog,
    notifier: &dyn Notifier,
    subject_prefix: &str,
) -> Result<(), HealthError> {
    let log_result = log.append(report);
    if let Err(e) = &log_result {
        tracing::error!("Failed to persist report: {}", e);
    }

    if !report.is_ok() {
        let subject = report.alert_subject(subject_prefix);
        let mut body = report.alert_body();
        if let Err(e) = &log_result {
            body.push_str(&format!("\n{}", e));
        }
        if let Err(e) = notifier.notify(&subject, &body) {
            tracing::warn!("Alert not delivered: {}", e);
        }
    }

    log_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NotifyError;
    use crate::health::{aggregate, evaluate, CheckPolicy, MetricSample, Threshold};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<(String, String)>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
            self.sent
                .borrow_mut()
                .push((subject.to_string(), body.to_string()));
            if self.fail {
                return Err(NotifyError::Unavailable("no mail tool".to_string()));
            }
            Ok(())
        }
    }

    fn report(memory: f64) -> HealthReport {
        aggregate(
            CheckPolicy::Local,
            vec![evaluate(
                &MetricSample::percent("Memory", memory),
                &Threshold::at_least("Memory", 20.0),
            )],
        )
    }

    #[test]
    fn test_ok_report_is_logged_without_alert() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReportLog::new(dir.path().join("health.log"));
        let notifier = RecordingNotifier::default();

        publish(&report(5.0), &log, &notifier, "[hostwatch]").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("[INFO] Memory usage 5.0%"));
        assert!(notifier.sent.borrow().is_empty());
    }

    #[test]
    fn test_failing_report_sends_alert_with_fail_messages() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReportLog::new(dir.path().join("health.log"));
        let notifier = RecordingNotifier::default();

        publish(&report(30.0), &log, &notifier, "[hostwatch]").unwrap();

        let sent = notifier.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "[hostwatch] Health check WARNING");
        assert_eq!(sent[0].1, "Memory usage 30.0% is at or above threshold 20.0%");
    }

    #[test]
    fn test_log_appends_across_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReportLog::new(dir.path().join("health.log"));
        let notifier = RecordingNotifier::default();

        publish(&report(5.0), &log, &notifier, "").unwrap();
        publish(&report(6.0), &log, &notifier, "").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_notification_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReportLog::new(dir.path().join("health.log"));
        let notifier = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        };

        assert!(publish(&report(30.0), &log, &notifier, "").is_ok());
    }

    #[test]
    fn test_unwritable_destination_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = ReportLog::new(dir.path().join("missing-dir").join("health.log"));
        let notifier = RecordingNotifier::default();

        let err = publish(&report(5.0), &log, &notifier, "").unwrap_err();
        assert!(matches!(err, HealthError::ReportDestination { .. }));
    }
}
