//! Local poll cycle driven through an in-memory metric source.

use hostwatch::configuration::Settings;
use hostwatch::errors::HealthError;
use hostwatch::health::procfs::{CpuTimes, MemInfo};
use hostwatch::health::{
    HealthStatus, LocalChecker, MetricSource, MountUsage, Sampler, Verdict,
};
use std::time::Duration;

/// Serves the same readings every cycle. The CPU counters alternate between
/// a base snapshot and one that is 15% busy relative to it.
struct FixtureSource {
    reads: usize,
    cpu_busy: u64,
    meminfo: Option<MemInfo>,
    mounts: Vec<MountUsage>,
    commands: Vec<String>,
}

impl FixtureSource {
    fn new() -> Self {
        Self {
            reads: 0,
            cpu_busy: 15,
            meminfo: Some(MemInfo {
                total: 1000,
                free: 100,
                available: Some(700),
                buffers: 0,
                cached: 0,
            }),
            mounts: vec![
                mount("/", "ext4", 1000, 900),
                mount("/data", "xfs", 1000, 750),
                mount("/run", "tmpfs", 1000, 0),
            ],
            commands: vec![
                "/usr/sbin/sshd -D".to_string(),
                "/usr/sbin/cron -f".to_string(),
            ],
        }
    }
}

fn mount(point: &str, fs: &str, total: u64, available: u64) -> MountUsage {
    MountUsage {
        mount_point: point.to_string(),
        file_system: fs.to_string(),
        total_bytes: total,
        available_bytes: available,
    }
}

impl MetricSource for FixtureSource {
    fn cpu_times(&mut self) -> Result<CpuTimes, HealthError> {
        self.reads += 1;
        if self.reads % 2 == 1 {
            return Ok(CpuTimes::default());
        }
        Ok(CpuTimes {
            user: self.cpu_busy,
            idle: 100 - self.cpu_busy,
            ..CpuTimes::default()
        })
    }

    fn meminfo(&mut self) -> Result<MemInfo, HealthError> {
        self.meminfo
            .ok_or_else(|| HealthError::source_unavailable("Memory", "/proc/meminfo: gone"))
    }

    fn mounts(&mut self) -> Result<Vec<MountUsage>, HealthError> {
        Ok(self.mounts.clone())
    }

    fn process_commands(&mut self) -> Result<Vec<String>, HealthError> {
        Ok(self.commands.clone())
    }
}

fn checker(source: FixtureSource) -> LocalChecker<FixtureSource> {
    let settings = Settings::default();
    LocalChecker::new(
        Sampler::new(source).with_cpu_window(Duration::ZERO),
        &settings,
    )
}

#[test]
fn test_warning_scenario_reports_exact_fail_set() {
    let mut checker = checker(FixtureSource::new());
    let report = checker.run_cycle();

    assert_eq!(report.status, HealthStatus::Warning);
    assert_eq!(report.exit_code(), 1);

    let metrics: Vec<&str> = report.results.iter().map(|r| r.metric.as_str()).collect();
    assert_eq!(
        metrics,
        vec!["CPU", "Memory", "Disk /", "Disk /data", "sshd", "nginx"]
    );

    let failed: Vec<&str> = report.failures().map(|r| r.metric.as_str()).collect();
    assert_eq!(failed, vec!["Memory", "Disk /data", "nginx"]);

    let body = report.alert_body();
    assert!(body.contains("Memory usage 30.0%"), "{body}");
    assert!(body.contains("Disk /data usage 25.0%"), "{body}");
    assert!(body.contains("Process 'nginx' is not running"), "{body}");
    assert!(!body.contains("CPU"), "{body}");
}

#[test]
fn test_all_within_thresholds_is_ok() {
    let mut source = FixtureSource::new();
    source.cpu_busy = 3;
    source.meminfo = Some(MemInfo {
        total: 1000,
        free: 950,
        available: None,
        buffers: 0,
        cached: 0,
    });
    source.mounts = vec![mount("/", "ext4", 1000, 990)];
    source.commands.push("nginx: master process /usr/sbin/nginx".to_string());

    let report = checker(source).run_cycle();
    assert_eq!(report.status, HealthStatus::Ok);
    assert_eq!(report.exit_code(), 0);
    assert!(report.results.iter().all(|r| r.verdict == Verdict::Pass));
}

#[test]
fn test_repeated_cycles_give_identical_verdicts() {
    let mut checker = checker(FixtureSource::new());
    let first = checker.run_cycle();
    let second = checker.run_cycle();

    let verdicts = |report: &hostwatch::health::HealthReport| {
        report
            .results
            .iter()
            .map(|r| (r.metric.clone(), r.verdict))
            .collect::<Vec<_>>()
    };
    assert_eq!(verdicts(&first), verdicts(&second));
    assert_eq!(first.status, second.status);
}

#[test]
fn test_unreadable_source_aborts_cycle_as_critical() {
    let mut source = FixtureSource::new();
    source.meminfo = None;

    let mut checker = checker(source);
    let report = checker.run_cycle();

    assert_eq!(report.status, HealthStatus::Critical);
    assert_eq!(report.exit_code(), 2);
    // CPU was sampled before the failure; nothing after it
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].metric, "CPU");
    assert!(report
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("/proc/meminfo"));
    assert!(report.summary().starts_with("Health check CRITICAL"));
}

#[test]
fn test_report_serializes_for_json_output() {
    let report = checker(FixtureSource::new()).run_cycle();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], "WARNING");
    assert_eq!(json["policy"], "local");
    assert_eq!(json["results"][1]["metric"], "Memory");
    assert_eq!(json["results"][1]["verdict"], "fail");
    assert_eq!(json["results"][1]["sample"]["value"]["kind"], "percent");
    assert!(json.get("error").is_none());
}
