use super::models::MetricSample;
use super::procfs::{cpu_utilization, memory_utilization, CpuTimes, MemInfo};
use crate::errors::HealthError;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use sysinfo::{Disks, ProcessRefreshKind, System, UpdateKind};

/// Window between the two CPU counter reads. Defines the measurement, so it
/// always elapses in full.
pub const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Filesystem types that never represent real storage.
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "ramfs",
    "proc",
    "sysfs",
    "cgroup",
    "cgroup2",
    "devpts",
    "securityfs",
    "debugfs",
    "tracefs",
    "pstore",
    "bpf",
    "mqueue",
    "hugetlbfs",
    "autofs",
    "configfs",
    "fusectl",
    "efivarfs",
    "squashfs",
    "nsfs",
    "binfmt_misc",
    "rpc_pipefs",
];

pub fn is_pseudo_filesystem(file_system: &str) -> bool {
    PSEUDO_FILESYSTEMS.contains(&file_system)
}

/// Space figures for one mounted filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountUsage {
    pub mount_point: String,
    pub file_system: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MountUsage {
    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        (100.0 * used as f64 / self.total_bytes as f64).clamp(0.0, 100.0)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MetricSource: raw OS readings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub trait MetricSource {
    fn cpu_times(&mut self) -> Result<CpuTimes, HealthError>;
    fn meminfo(&mut self) -> Result<MemInfo, HealthError>;
    fn mounts(&mut self) -> Result<Vec<MountUsage>, HealthError>;
    /// Command lines (or names, for kernel threads) of running processes.
    fn process_commands(&mut self) -> Result<Vec<String>, HealthError>;
}

/// Production source: procfs for CPU and memory counters, `sysinfo` for the
/// mount and process tables.
pub struct SystemSource {
    proc_root: PathBuf,
    system: System,
    disks: Disks,
}

impl SystemSource {
    pub fn new() -> Self {
        Self::with_proc_root("/proc")
    }

    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            system: System::new(),
            disks: Disks::new(),
        }
    }

    fn read_proc(&self, metric: &str, file: &str) -> Result<String, HealthError> {
        let path = self.proc_root.join(file);
        std::fs::read_to_string(&path).map_err(|e| {
            HealthError::source_unavailable(metric, format!("{}: {}", path.display(), e))
        })
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SystemSource {
    fn cpu_times(&mut self) -> Result<CpuTimes, HealthError> {
        let stat = self.read_proc("CPU", "stat")?;
        CpuTimes::parse(&stat).map_err(|e| HealthError::source_unavailable("CPU", e))
    }

    fn meminfo(&mut self) -> Result<MemInfo, HealthError> {
        let meminfo = self.read_proc("Memory", "meminfo")?;
        MemInfo::parse(&meminfo).map_err(|e| HealthError::source_unavailable("Memory", e))
    }

    fn mounts(&mut self) -> Result<Vec<MountUsage>, HealthError> {
        self.disks.refresh_list();

        let mounts = self
            .disks
            .list()
            .iter()
            .map(|disk| MountUsage {
                mount_point: disk.mount_point().to_string_lossy().to_string(),
                file_system: disk.file_system().to_string_lossy().to_string(),
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            })
            .collect();

        Ok(mounts)
    }

    /// Excludes hostwatch itself, whose own arguments may mention a watched
    /// name. Threads listed as tasks carry the same command line and are
    /// dropped with it.
    fn process_commands(&mut self) -> Result<Vec<String>, HealthError> {
        self.system.refresh_processes_specifics(
            ProcessRefreshKind::new().with_cmd(UpdateKind::OnlyIfNotSet),
        );
        let own_pid = sysinfo::get_current_pid().ok();
        let own_command = own_pid
            .and_then(|pid| self.system.process(pid))
            .map(command_line);

        let commands = self
            .system
            .processes()
            .iter()
            .filter(|(pid, _)| Some(**pid) != own_pid)
            .map(|(_, process)| command_line(process))
            .filter(|command| Some(command) != own_command.as_ref())
            .collect();

        Ok(commands)
    }
}

/// Full command line, or the short name for kernel threads.
fn command_line(process: &sysinfo::Process) -> String {
    let cmd = process.cmd();
    if cmd.is_empty() {
        process.name().to_string()
    } else {
        cmd.join(" ")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Process matching
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A watch-list entry: a regular expression, or a literal substring when the
/// pattern does not compile.
#[derive(Debug, Clone)]
pub enum ProcessPattern {
    Regex(Regex),
    Literal(String),
}

impl ProcessPattern {
    pub fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => Self::Regex(regex),
            Err(e) => {
                tracing::debug!(pattern, error = %e, "pattern is not a regex, matching literally");
                Self::Literal(pattern.to_string())
            }
        }
    }

    pub fn matches(&self, command: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(command),
            Self::Literal(literal) => command.contains(literal.as_str()),
        }
    }

    pub fn matches_any(&self, commands: &[String]) -> bool {
        commands.iter().any(|command| self.matches(command))
    }
}

/// Watch-list entries with no matching process, in watch-list order.
pub fn missing_processes(patterns: &[String], commands: &[String]) -> Vec<String> {
    patterns
        .iter()
        .filter(|pattern| !ProcessPattern::new(pattern).matches_any(commands))
        .cloned()
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sampler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Local metrics the sampler knows how to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Memory,
    /// One sample per real mounted filesystem
    Disk,
    /// Liveness of processes matching the pattern
    Process(String),
}

pub struct Sampler<S> {
    source: S,
    cpu_window: Duration,
}

impl<S: MetricSource> Sampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cpu_window: CPU_SAMPLE_WINDOW,
        }
    }

    /// Overrides the CPU window; for fixtures that do not need real time.
    pub fn with_cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sample(&mut self, metric: &Metric) -> Result<Vec<MetricSample>, HealthError> {
        match metric {
            Metric::Cpu => Ok(vec![self.sample_cpu()?]),
            Metric::Memory => Ok(vec![self.sample_memory()?]),
            Metric::Disk => self.sample_disks(),
            Metric::Process(pattern) => self.sample_processes(std::slice::from_ref(pattern)),
        }
    }

    #[tracing::instrument(name = "Sample CPU", skip(self))]
    pub fn sample_cpu(&mut self) -> Result<MetricSample, HealthError> {
        let first = self.source.cpu_times()?;
        std::thread::sleep(self.cpu_window);
        let second = self.source.cpu_times()?;

        let usage = cpu_utilization(&first, &second);
        tracing::debug!(usage, "CPU sampled");
        Ok(MetricSample::percent("CPU", usage))
    }

    #[tracing::instrument(name = "Sample memory", skip(self))]
    pub fn sample_memory(&mut self) -> Result<MetricSample, HealthError> {
        let info = self.source.meminfo()?;
        if info.available.is_none() {
            tracing::debug!("MemAvailable not reported, using free + buffers + cached");
        }
        Ok(MetricSample::percent("Memory", memory_utilization(&info)))
    }

    #[tracing::instrument(name = "Sample disks", skip(self))]
    pub fn sample_disks(&mut self) -> Result<Vec<MetricSample>, HealthError> {
        let samples = self
            .source
            .mounts()?
            .into_iter()
            .filter(|mount| !is_pseudo_filesystem(&mount.file_system))
            .map(|mount| {
                MetricSample::percent(format!("Disk {}", mount.mount_point), mount.used_percent())
            })
            .collect();
        Ok(samples)
    }

    /// Reads the process table once and reports each pattern's liveness.
    #[tracing::instrument(name = "Sample processes", skip(self))]
    pub fn sample_processes(
        &mut self,
        patterns: &[String],
    ) -> Result<Vec<MetricSample>, HealthError> {
        let commands = self.source.process_commands()?;
        let missing = missing_processes(patterns, &commands);

        let samples = patterns
            .iter()
            .map(|pattern| MetricSample::presence(pattern.as_str(), !missing.contains(pattern)))
            .collect();
        Ok(samples)
    }
}
