use super::models::{CheckResult, Comparator, MetricSample, SampleValue, Threshold, Verdict};

/// HTTP status codes outside 2xx that still count as a healthy answer.
const ACCEPTED_REDIRECTS: [u16; 2] = [301, 302];

/// Compares one sample against its threshold. Pure and total: every pairing,
/// including a sample kind that does not fit the comparator, yields a verdict.
pub fn evaluate(sample: &MetricSample, threshold: &Threshold) -> CheckResult {
    let name = &sample.name;
    let (verdict, message) = match (&sample.value, &threshold.comparator) {
        (SampleValue::Percent { value }, Comparator::AtLeast { limit }) => {
            if *value >= *limit {
                (
                    Verdict::Fail,
                    format!(
                        "{} usage {:.1}% is at or above threshold {:.1}%",
                        name, value, limit
                    ),
                )
            } else {
                (
                    Verdict::Pass,
                    format!("{} usage {:.1}% (threshold {:.1}%)", name, value, limit),
                )
            }
        }
        (SampleValue::Presence { found }, Comparator::Presence) => {
            if *found {
                (Verdict::Pass, format!("Process '{}' is running", name))
            } else {
                (Verdict::Fail, format!("Process '{}' is not running", name))
            }
        }
        (
            SampleValue::Http {
                status,
                elapsed_secs,
            },
            Comparator::HttpSuccess,
        ) => match status {
            Some(code) if is_success_status(*code) => (
                Verdict::Pass,
                format!("{} responded {} in {:.3}s", name, code, elapsed_secs),
            ),
            Some(code) => (
                Verdict::Fail,
                format!("{} returned status {} in {:.3}s", name, code, elapsed_secs),
            ),
            None => (
                Verdict::Fail,
                format!(
                    "{} did not respond (NO_RESPONSE) after {:.3}s",
                    name, elapsed_secs
                ),
            ),
        },
        (value, comparator) => (
            Verdict::Fail,
            format!(
                "{}: {} sample cannot be compared with a {} threshold",
                name,
                value.unit(),
                comparator
            ),
        ),
    };

    CheckResult {
        metric: sample.name.clone(),
        sample: sample.clone(),
        threshold: threshold.clone(),
        verdict,
        message,
    }
}

pub fn is_success_status(code: u16) -> bool {
    (200..=299).contains(&code) || ACCEPTED_REDIRECTS.contains(&code)
}
