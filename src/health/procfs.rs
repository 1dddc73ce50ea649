//! Typed readers for the kernel's `/proc/stat` and `/proc/meminfo`.

/// Malformed content in a metrics pseudo-file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no aggregate `cpu` line")]
    MissingCpuLine,
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("invalid value {value:?} for {field}")]
    InvalidNumber { field: String, value: String },
}

/// Cumulative CPU time counters, in clock ticks since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

const CPU_FIELDS: [&str; 8] = [
    "user", "nice", "system", "idle", "iowait", "irq", "softirq", "steal",
];

impl CpuTimes {
    /// Reads the aggregate `cpu` line. Kernels that report fewer than eight
    /// counters leave the missing ones at zero; the first four are required.
    pub fn parse(stat: &str) -> Result<Self, ParseError> {
        let line = stat
            .lines()
            .find(|line| line.split_whitespace().next() == Some("cpu"))
            .ok_or(ParseError::MissingCpuLine)?;

        let mut counters = [0u64; 8];
        let mut values = line.split_whitespace().skip(1);
        for (index, field) in CPU_FIELDS.iter().enumerate() {
            match values.next() {
                Some(raw) => counters[index] = parse_number(field, raw)?,
                None if index < 4 => return Err(ParseError::MissingField(*field)),
                None => break,
            }
        }

        let [user, nice, system, idle, iowait, irq, softirq, steal] = counters;
        Ok(Self {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
        })
    }

    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }
}

/// Busy share of the interval between two counter snapshots, in percent.
///
/// An empty interval reads as 0%. Counters that went backwards (counter reset,
/// CPU hot-unplug) are treated as no progress.
pub fn cpu_utilization(prev: &CpuTimes, next: &CpuTimes) -> f64 {
    let total = next.total().saturating_sub(prev.total());
    if total == 0 {
        return 0.0;
    }
    let idle = next.idle_total().saturating_sub(prev.idle_total());
    let busy = total.saturating_sub(idle);

    (100.0 * busy as f64 / total as f64).clamp(0.0, 100.0)
}

/// Memory counters in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total: u64,
    pub free: u64,
    /// `MemAvailable`; absent on kernels older than 3.14
    pub available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
}

impl MemInfo {
    pub fn parse(meminfo: &str) -> Result<Self, ParseError> {
        let mut total = None;
        let mut free = None;
        let mut info = MemInfo::default();

        for line in meminfo.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let raw = rest.trim().trim_end_matches("kB").trim();
            match key.trim() {
                "MemTotal" => total = Some(parse_number(key, raw)?),
                "MemFree" => free = Some(parse_number(key, raw)?),
                "MemAvailable" => info.available = Some(parse_number(key, raw)?),
                "Buffers" => info.buffers = parse_number(key, raw)?,
                "Cached" => info.cached = parse_number(key, raw)?,
                _ => {}
            }
        }

        info.total = total.ok_or(ParseError::MissingField("MemTotal"))?;
        info.free = free.ok_or(ParseError::MissingField("MemFree"))?;
        Ok(info)
    }

    /// Reported `MemAvailable`, or free + buffers + cached when the kernel
    /// does not report it.
    pub fn available(&self) -> u64 {
        self.available.unwrap_or_else(|| {
            self.free
                .saturating_add(self.buffers)
                .saturating_add(self.cached)
        })
    }
}

/// Used share of memory in percent; 0% when the total is zero.
pub fn memory_utilization(info: &MemInfo) -> f64 {
    if info.total == 0 {
        return 0.0;
    }
    let used = info.total.saturating_sub(info.available());

    (100.0 * used as f64 / info.total as f64).clamp(0.0, 100.0)
}

fn parse_number(field: &str, raw: &str) -> Result<u64, ParseError> {
    raw.parse::<u64>().map_err(|_| ParseError::InvalidNumber {
        field: field.to_string(),
        value: raw.to_string(),
    })
}
