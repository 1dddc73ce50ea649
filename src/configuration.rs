use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_THRESHOLD_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    pub thresholds: ThresholdSettings,
    pub processes: Vec<String>,
    pub report: ReportSettings,
    pub alert: AlertSettings,
    pub http: HttpSettings,
    pub schedule: ScheduleSettings,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ThresholdSettings {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub recipient: Option<String>,
    pub mail_command: String,
    pub subject_prefix: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub url: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub interval_secs: u64,
    /// Number of cycles in repeating mode; `None` repeats forever.
    pub cycles: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: ThresholdSettings::default(),
            processes: vec!["sshd".to_string(), "nginx".to_string()],
            report: ReportSettings::default(),
            alert: AlertSettings::default(),
            http: HttpSettings::default(),
            schedule: ScheduleSettings::default(),
        }
    }
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            cpu: DEFAULT_THRESHOLD_PERCENT,
            memory: DEFAULT_THRESHOLD_PERCENT,
            disk: DEFAULT_THRESHOLD_PERCENT,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/var/log/hostwatch.log"),
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            recipient: None,
            mail_command: "mail".to_string(),
            subject_prefix: "[hostwatch]".to_string(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1/".to_string(),
            timeout_secs: 5,
            retries: 2,
            retry_delay_secs: 1,
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            cycles: None,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl ScheduleSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Settings {
    /// Rejects values the checks cannot work with.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        for (name, value) in [
            ("thresholds.cpu", self.thresholds.cpu),
            ("thresholds.memory", self.thresholds.memory),
            ("thresholds.disk", self.thresholds.disk),
        ] {
            if !(value > 0.0 && value <= 100.0) {
                return Err(config::ConfigError::Message(format!(
                    "{} must be within (0, 100], got {}",
                    name, value
                )));
            }
        }

        if self.http.timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "http.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.http.url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "http.url must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Layers built-in defaults, an optional configuration file and
/// `HOSTWATCH__*` environment variables, in that order.
pub fn get_configuration(path: Option<&Path>) -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let file = match path {
        // An explicitly named file must exist
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("configuration").required(false),
    };

    let settings = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("HOSTWATCH")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("processes")
                .try_parsing(true),
        )
        .build()?;

    let config: Settings = settings.try_deserialize()?;
    config.validate()?;

    Ok(config)
}
