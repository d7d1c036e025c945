use std::time::Duration;

/// Exponential backoff between retry attempts: `base * factor^attempt`,
/// clamped so the computed delay never exceeds `cap`.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the first retry.
    pub base: Duration,
    /// Factor applied on each successive attempt.
    pub factor: f64,
    /// Upper bound on the computed delay.
    pub cap: Duration,
}

impl Backoff {
    /// Compute the delay for the given zero-based `attempt` number.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_secs = self.base.as_secs_f64();
        // Retry counts stay far below i32::MAX in practice.
        #[allow(clippy::cast_possible_wrap)]
        let raw = base_secs * self.factor.powi(attempt as i32);
        let clamped = raw.min(self.cap.as_secs_f64());
        Duration::from_secs_f64(clamped)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(30),
            factor: 2.0,
            cap: Duration::from_secs(900),
        }
    }
}
