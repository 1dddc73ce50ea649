use super::models::MetricSample;
use crate::errors::HealthError;
use std::time::{Duration, Instant};

/// One HTTP reading of a target. Never fails: an unreachable target produces
/// the NO_RESPONSE sentinel sample.
pub trait HttpProbe {
    fn probe(&self, url: &str) -> MetricSample;
}

/// Blocking reqwest probe. Redirects are not followed so 301/302 answers are
/// observed as such.
pub struct ReqwestProbe {
    client: reqwest::blocking::Client,
}

impl ReqwestProbe {
    pub fn new(timeout: Duration) -> Result<Self, HealthError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| HealthError::source_unavailable("HTTP client", e))?;

        Ok(Self { client })
    }
}

impl HttpProbe for ReqwestProbe {
    #[tracing::instrument(name = "Probe HTTP target", skip(self))]
    fn probe(&self, url: &str) -> MetricSample {
        let start = Instant::now();

        match self.client.get(url).send() {
            Ok(response) => {
                let elapsed = start.elapsed().as_secs_f64();
                let status = response.status().as_u16();
                tracing::debug!(status, elapsed, "HTTP target answered");
                MetricSample::http(url, status, elapsed)
            }
            Err(e) => {
                let elapsed = start.elapsed().as_secs_f64();
                if e.is_timeout() {
                    tracing::warn!("HTTP probe timed out after {:.3}s: {}", elapsed, e);
                } else {
                    tracing::warn!("HTTP probe failed: {:?}", e);
                }
                MetricSample::no_response(url, elapsed)
            }
        }
    }
}
