use std::time::Duration;

/// Bounded retry: up to `max_attempts` runs of an operation with a fixed
/// delay between them, stopping early once the stop predicate accepts a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

/// The last value produced and how many attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

impl RetryPolicy {
    /// `retries` extra attempts after the first one.
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `op` (given the 1-based attempt number) until `stop` accepts its
    /// value or the attempts are exhausted. Sleeps only between attempts.
    pub fn run<T, F, P>(&self, mut op: F, stop: P) -> Attempted<T>
    where
        F: FnMut(u32) -> T,
        P: Fn(&T) -> bool,
    {
        let mut attempt = 1;
        loop {
            let value = op(attempt);
            if stop(&value) || attempt >= self.max_attempts {
                return Attempted {
                    value,
                    attempts: attempt,
                };
            }
            tracing::debug!(attempt, delay = ?self.delay, "attempt rejected, retrying");
            std::thread::sleep(self.delay);
            attempt += 1;
        }
    }
}
