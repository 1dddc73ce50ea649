use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Boolean,
    StatusLatency,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent => write!(f, "percent"),
            Self::Boolean => write!(f, "boolean"),
            Self::StatusLatency => write!(f, "status-code+latency"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleValue {
    Percent {
        value: f64,
    },
    Presence {
        found: bool,
    },
    /// `status` is `None` for the NO_RESPONSE sentinel.
    Http {
        status: Option<u16>,
        elapsed_secs: f64,
    },
}

impl SampleValue {
    pub fn unit(&self) -> Unit {
        match self {
            Self::Percent { .. } => Unit::Percent,
            Self::Presence { .. } => Unit::Boolean,
            Self::Http { .. } => Unit::StatusLatency,
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent { value } => write!(f, "{:.1}%", value),
            Self::Presence { found: true } => write!(f, "running"),
            Self::Presence { found: false } => write!(f, "not running"),
            Self::Http {
                status: Some(status),
                elapsed_secs,
            } => write!(f, "{} in {:.3}s", status, elapsed_secs),
            Self::Http {
                status: None,
                elapsed_secs,
            } => write!(f, "NO_RESPONSE after {:.3}s", elapsed_secs),
        }
    }
}

/// One reading of one metric. Never mutated after it is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: SampleValue,
    pub timestamp: DateTime<Local>,
}

impl MetricSample {
    fn new(name: impl Into<String>, value: SampleValue) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp: Local::now(),
        }
    }

    pub fn percent(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, SampleValue::Percent { value })
    }

    pub fn presence(name: impl Into<String>, found: bool) -> Self {
        Self::new(name, SampleValue::Presence { found })
    }

    pub fn http(name: impl Into<String>, status: u16, elapsed_secs: f64) -> Self {
        Self::new(
            name,
            SampleValue::Http {
                status: Some(status),
                elapsed_secs,
            },
        )
    }

    pub fn no_response(name: impl Into<String>, elapsed_secs: f64) -> Self {
        Self::new(
            name,
            SampleValue::Http {
                status: None,
                elapsed_secs,
            },
        )
    }

    pub fn unit(&self) -> Unit {
        self.value.unit()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Comparator {
    /// Fails when the sample is greater than or equal to `limit`
    AtLeast { limit: f64 },
    /// Fails when the thing looked for is absent
    Presence,
    /// Fails unless the status is 2xx, 301 or 302
    HttpSuccess,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast { limit } => write!(f, ">= {:.1}%", limit),
            Self::Presence => write!(f, "presence"),
            Self::HttpSuccess => write!(f, "http-success"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: String,
    pub comparator: Comparator,
}

impl Threshold {
    pub fn at_least(metric: impl Into<String>, limit: f64) -> Self {
        Self {
            metric: metric.into(),
            comparator: Comparator::AtLeast { limit },
        }
    }

    pub fn presence(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            comparator: Comparator::Presence,
        }
    }

    pub fn http_success(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            comparator: Comparator::HttpSuccess,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub metric: String,
    pub sample: MetricSample,
    pub threshold: Threshold,
    pub verdict: Verdict,
    pub message: String,
}

impl CheckResult {
    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn is_fail(&self) -> bool {
        self.verdict == Verdict::Fail
    }
}

/// Which scheduling policy produced a report. Decides how a failure is
/// classified and which exit code it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckPolicy {
    /// Single sequential pass over local metrics
    Local,
    /// Bounded-retry probe of an HTTP target
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Warning,
    Down,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Warning => write!(f, "WARNING"),
            Self::Down => write!(f, "DOWN"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Local>,
    pub policy: CheckPolicy,
    pub status: HealthStatus,
    pub results: Vec<CheckResult>,
    /// Probe attempts spent; always 1 for local cycles.
    pub attempts: u32,
    /// Set when a setup error aborted the cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn new(policy: CheckPolicy) -> Self {
        Self {
            timestamp: Local::now(),
            policy,
            status: HealthStatus::Ok,
            results: Vec::new(),
            attempts: 1,
            error: None,
        }
    }

    /// Records a result and escalates the status. A report never recovers
    /// from a worse status.
    pub fn add_result(&mut self, result: CheckResult) {
        if result.is_fail() && self.status == HealthStatus::Ok {
            self.status = match self.policy {
                CheckPolicy::Local => HealthStatus::Warning,
                CheckPolicy::Http => HealthStatus::Down,
            };
        }
        self.results.push(result);
    }

    /// Marks the cycle as aborted by an unrecoverable setup error.
    pub fn abort(&mut self, error: impl ToString) {
        self.status = HealthStatus::Critical;
        self.error = Some(error.to_string());
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| r.is_fail())
    }

    /// Process exit code for this report.
    pub fn exit_code(&self) -> u8 {
        match self.status {
            HealthStatus::Ok => 0,
            HealthStatus::Warning => 1,
            HealthStatus::Down | HealthStatus::Critical => 2,
        }
    }
}
