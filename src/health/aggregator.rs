use super::models::{CheckPolicy, CheckResult, HealthReport, HealthStatus};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Folds one cycle's results into a report.
pub fn aggregate(policy: CheckPolicy, results: Vec<CheckResult>) -> HealthReport {
    let mut report = HealthReport::new(policy);
    for result in results {
        report.add_result(result);
    }
    report
}

impl HealthReport {
    fn result_tag(&self, result: &CheckResult) -> &'static str {
        match (self.policy, result.is_pass()) {
            (CheckPolicy::Local, true) => "INFO",
            (CheckPolicy::Local, false) => "WARN",
            (CheckPolicy::Http, true) => "OK",
            (CheckPolicy::Http, false) => "ALERT",
        }
    }

    /// The closing line of a cycle.
    pub fn summary(&self) -> String {
        match self.status {
            HealthStatus::Ok => match self.policy {
                CheckPolicy::Local => "Health check OK: all checks passed".to_string(),
                CheckPolicy::Http => format!(
                    "{} is UP after {} attempt(s)",
                    self.target(),
                    self.attempts
                ),
            },
            HealthStatus::Warning => format!(
                "Health check WARNING: {} problem(s) found",
                self.failures().count()
            ),
            HealthStatus::Down => format!(
                "{} is DOWN after {} attempt(s)",
                self.target(),
                self.attempts
            ),
            HealthStatus::Critical => format!(
                "Health check CRITICAL: {}",
                self.error.as_deref().unwrap_or("cycle aborted")
            ),
        }
    }

    /// Timestamped report lines: one per check, then the summary.
    pub fn lines(&self) -> Vec<String> {
        let stamp = self.timestamp.format(TIMESTAMP_FORMAT).to_string();

        let mut lines: Vec<String> = self
            .results
            .iter()
            .map(|result| format!("{} [{}] {}", stamp, self.result_tag(result), result.message))
            .collect();

        let summary_tag = if self.is_ok() { "OK" } else { "ALERT" };
        lines.push(format!("{} [{}] {}", stamp, summary_tag, self.summary()));
        lines
    }

    pub fn alert_subject(&self, prefix: &str) -> String {
        format!("{} Health check {}", prefix, self.status)
            .trim()
            .to_string()
    }

    /// Failure messages, one per line, preceded by the setup error if any.
    pub fn alert_body(&self) -> String {
        self.error
            .iter()
            .cloned()
            .chain(self.failures().map(|r| r.message.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn target(&self) -> &str {
        self.results
            .first()
            .map(|r| r.metric.as_str())
            .unwrap_or("target")
    }
}
