use super::aggregator::aggregate;
use super::evaluator::evaluate;
use super::models::{CheckPolicy, CheckResult, HealthReport, Threshold};
use super::probe::HttpProbe;
use super::retry::RetryPolicy;
use super::sampler::{MetricSource, Sampler};
use crate::configuration::{Settings, ThresholdSettings};
use crate::errors::HealthError;
use std::time::Duration;

/// Fixed single-cycle policy: one sequential pass over CPU, memory, disks and
/// the process watch list.
pub struct LocalChecker<S> {
    sampler: Sampler<S>,
    thresholds: ThresholdSettings,
    processes: Vec<String>,
}

impl<S: MetricSource> LocalChecker<S> {
    pub fn new(sampler: Sampler<S>, settings: &Settings) -> Self {
        Self {
            sampler,
            thresholds: settings.thresholds.clone(),
            processes: settings.processes.clone(),
        }
    }

    /// Runs one poll cycle. An unreadable source aborts the remaining checks
    /// and the report comes back CRITICAL with whatever was gathered so far.
    #[tracing::instrument(name = "Local health check", skip(self))]
    pub fn run_cycle(&mut self) -> HealthReport {
        let mut results = Vec::new();
        let outcome = self.collect(&mut results);

        let mut report = aggregate(CheckPolicy::Local, results);
        if let Err(e) = outcome {
            tracing::error!("Local health check aborted: {}", e);
            report.abort(e);
        }
        report
    }

    fn collect(&mut self, results: &mut Vec<CheckResult>) -> Result<(), HealthError> {
        let cpu = self.sampler.sample_cpu()?;
        results.push(evaluate(&cpu, &Threshold::at_least("CPU", self.thresholds.cpu)));

        let memory = self.sampler.sample_memory()?;
        results.push(evaluate(
            &memory,
            &Threshold::at_least("Memory", self.thresholds.memory),
        ));

        let disk_threshold = Threshold::at_least("Disk", self.thresholds.disk);
        for disk in self.sampler.sample_disks()? {
            results.push(evaluate(&disk, &disk_threshold));
        }

        for process in self.sampler.sample_processes(&self.processes)? {
            results.push(evaluate(&process, &Threshold::presence(process.name.as_str())));
        }

        Ok(())
    }
}

/// Bounded-retry policy for one HTTP target.
pub struct HttpChecker<P> {
    probe: P,
    url: String,
    policy: RetryPolicy,
}

impl<P: HttpProbe> HttpChecker<P> {
    pub fn new(probe: P, url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            probe,
            url: url.into(),
            policy,
        }
    }

    /// Probes until one attempt passes or the policy is exhausted. The report
    /// carries the final attempt's result and the number of attempts spent.
    #[tracing::instrument(name = "HTTP health check", skip(self), fields(url = %self.url))]
    pub fn run(&self) -> HealthReport {
        let threshold = Threshold::http_success(self.url.as_str());
        let max_attempts = self.policy.max_attempts();

        let outcome = self.policy.run(
            |attempt| {
                let result = evaluate(&self.probe.probe(&self.url), &threshold);
                if result.is_fail() {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        "HTTP attempt failed: {}",
                        result.message
                    );
                }
                result
            },
            CheckResult::is_pass,
        );

        aggregate(CheckPolicy::Http, vec![outcome.value]).with_attempts(outcome.attempts)
    }
}

/// Repeating mode. Cycles run back to back with `interval` of idle time
/// between the end of one cycle and the start of the next, so they never
/// overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    /// `None` repeats forever.
    pub cycles: Option<u64>,
}

impl Schedule {
    pub fn new(interval: Duration, cycles: Option<u64>) -> Self {
        Self { interval, cycles }
    }

    /// Drives `cycle` (given the 1-based cycle number) and returns the last
    /// report, or `None` when zero cycles were requested.
    pub fn run<F>(&self, mut cycle: F) -> Option<HealthReport>
    where
        F: FnMut(u64) -> HealthReport,
    {
        let mut last = None;
        let mut number = 1;
        loop {
            if let Some(limit) = self.cycles {
                if number > limit {
                    return last;
                }
            }

            let report = cycle(number);
            tracing::info!(cycle = number, status = %report.status, "poll cycle finished");
            last = Some(report);

            let more = self.cycles.map_or(true, |limit| number < limit);
            if more {
                std::thread::sleep(self.interval);
            }
            number += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::models::{HealthStatus, MetricSample};
    use std::cell::Cell;

    struct ScriptedProbe {
        statuses: Vec<Option<u16>>,
        calls: Cell<usize>,
    }

    impl HttpProbe for ScriptedProbe {
        fn probe(&self, url: &str) -> MetricSample {
            let index = self.calls.get();
            self.calls.set(index + 1);
            match self.statuses[index.min(self.statuses.len() - 1)] {
                Some(status) => MetricSample::http(url, status, 0.01),
                None => MetricSample::no_response(url, 0.01),
            }
        }
    }

    fn checker(statuses: Vec<Option<u16>>, retries: u32) -> HttpChecker<ScriptedProbe> {
        HttpChecker::new(
            ScriptedProbe {
                statuses,
                calls: Cell::new(0),
            },
            "http://10.0.0.1/",
            RetryPolicy::new(retries, Duration::ZERO),
        )
    }

    #[test]
    fn test_http_success_takes_one_attempt() {
        let checker = checker(vec![Some(200)], 2);
        let report = checker.run();
        assert_eq!(report.status, HealthStatus::Ok);
        assert_eq!(report.attempts, 1);
        assert_eq!(checker.probe.calls.get(), 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_http_recovers_on_a_later_attempt() {
        let checker = checker(vec![None, Some(502), Some(302)], 2);
        let report = checker.run();
        assert_eq!(report.status, HealthStatus::Ok);
        assert_eq!(report.attempts, 3);
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].is_pass());
    }

    #[test]
    fn test_http_no_response_exhausts_retries() {
        for retries in [0, 1, 2, 5] {
            let checker = checker(vec![None], retries);
            let report = checker.run();
            assert_eq!(report.status, HealthStatus::Down);
            assert_eq!(report.attempts, retries + 1);
            assert_eq!(checker.probe.calls.get(), (retries + 1) as usize);
            assert_eq!(report.exit_code(), 2);
        }
    }

    #[test]
    fn test_schedule_runs_bounded_cycles_in_order() {
        let schedule = Schedule::new(Duration::ZERO, Some(3));
        let mut seen = Vec::new();
        let last = schedule.run(|n| {
            seen.push(n);
            HealthReport::new(CheckPolicy::Local)
        });
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(last.is_some());
    }

    #[test]
    fn test_schedule_with_zero_cycles_runs_nothing() {
        let schedule = Schedule::new(Duration::ZERO, Some(0));
        let last = schedule.run(|_| panic!("no cycle expected"));
        assert!(last.is_none());
    }

    #[test]
    fn test_schedule_waits_between_cycles_not_after_last() {
        let schedule = Schedule::new(Duration::from_millis(40), Some(3));
        let started = std::time::Instant::now();
        schedule.run(|_| HealthReport::new(CheckPolicy::Local));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(80), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1000), "elapsed {elapsed:?}");
    }
}
