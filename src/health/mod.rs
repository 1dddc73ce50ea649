mod aggregator;
mod checks;
mod evaluator;
mod models;
pub mod probe;
pub mod procfs;
mod retry;
pub mod sampler;

pub use aggregator::aggregate;
pub use checks::{HttpChecker, LocalChecker, Schedule};
pub use evaluator::{evaluate, is_success_status};
pub use models::{
    CheckPolicy, CheckResult, Comparator, HealthReport, HealthStatus, MetricSample, SampleValue,
    Threshold, Unit, Verdict,
};
pub use probe::{HttpProbe, ReqwestProbe};
pub use retry::{Attempted, RetryPolicy};
pub use sampler::{Metric, MetricSource, MountUsage, Sampler, SystemSource};
