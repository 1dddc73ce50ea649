use crate::configuration::AlertSettings;
use crate::errors::NotifyError;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// How long the mail command may run before the alert counts as undelivered.
pub const MAIL_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers an alert for a non-OK report. Best effort: callers log failures
/// and carry on.
pub trait Notifier {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Hands the alert to a `mail`-compatible command:
/// `<program> -s <subject> <recipient>` with the body on stdin.
pub struct MailCommandNotifier {
    program: String,
    recipient: Option<String>,
    timeout: Duration,
}

impl MailCommandNotifier {
    pub fn new(program: impl Into<String>, recipient: Option<String>) -> Self {
        Self {
            program: program.into(),
            recipient,
            timeout: MAIL_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_settings(settings: &AlertSettings) -> Self {
        Self::new(settings.mail_command.clone(), settings.recipient.clone())
    }
}

impl Notifier for MailCommandNotifier {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let recipient = self
            .recipient
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| NotifyError::Unavailable("no alert recipient configured".to_string()))?;

        let mut child = Command::new(&self.program)
            .arg("-s")
            .arg(subject)
            .arg(recipient)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    NotifyError::Unavailable(format!("{} not found on this host", self.program))
                }
                _ => NotifyError::DeliveryFailed(format!("{}: {}", self.program, e)),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(body.as_bytes())
                .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
        }

        let status = match child
            .wait_timeout(self.timeout)
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?
        {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(NotifyError::DeliveryFailed(format!(
                    "{} did not finish within {}s",
                    self.program,
                    self.timeout.as_secs_f64()
                )));
            }
        };
        if !status.success() {
            return Err(NotifyError::DeliveryFailed(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        tracing::info!(recipient, subject, "alert sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_recipient_is_unavailable() {
        let notifier = MailCommandNotifier::new("mail", None);
        let err = notifier.notify("subject", "body").unwrap_err();
        assert!(matches!(err, NotifyError::Unavailable(_)));

        let notifier = MailCommandNotifier::new("mail", Some("   ".to_string()));
        assert!(matches!(
            notifier.notify("subject", "body"),
            Err(NotifyError::Unavailable(_))
        ));
    }

    #[test]
    fn test_missing_mail_tool_is_unavailable() {
        let notifier = MailCommandNotifier::new(
            "/nonexistent/bin/mail",
            Some("ops@example.com".to_string()),
        );
        let err = notifier.notify("subject", "body").unwrap_err();
        assert!(matches!(err, NotifyError::Unavailable(_)), "got {err:?}");
        assert!(err.to_string().contains("/nonexistent/bin/mail"));
    }

    // `sh -s` runs the piped body as a script, standing in for a mail tool.
    #[test]
    fn test_accepted_message_is_delivered() {
        let notifier = MailCommandNotifier::new("sh", Some("exit 0".to_string()));
        assert!(notifier.notify("subject", "exit 0").is_ok());
    }

    #[test]
    fn test_failing_mail_tool_is_delivery_failure() {
        let notifier = MailCommandNotifier::new("sh", Some("ops".to_string()));
        let err = notifier.notify("subject", "exit 3").unwrap_err();
        assert!(matches!(err, NotifyError::DeliveryFailed(_)), "got {err:?}");
    }

    #[test]
    fn test_hanging_mail_tool_times_out() {
        let notifier = MailCommandNotifier::new("sh", Some("ops".to_string()))
            .with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = notifier.notify("subject", "sleep 10").unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(err, NotifyError::DeliveryFailed(_)), "got {err:?}");
        assert!(err.to_string().contains("did not finish"), "got {err}");
    }

    #[test]
    fn test_from_settings_uses_configured_command() {
        let settings = AlertSettings {
            recipient: None,
            mail_command: "/nonexistent/sendmail".to_string(),
            subject_prefix: String::new(),
        };
        let notifier = MailCommandNotifier::from_settings(&settings);
        assert_eq!(notifier.program, "/nonexistent/sendmail");
    }
}
