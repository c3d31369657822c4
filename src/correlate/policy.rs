//! Delays between correlation attempts.

use std::fmt::Debug;
use std::time::Duration;

/// Delay to wait after a missed attempt.
pub trait RetryPolicy: Send + Sync + Debug {
    /// Delay after the miss on `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Same delay after every miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedInterval(pub Duration);

impl Default for FixedInterval {
    fn default() -> Self {
        Self(Duration::from_secs(1))
    }
}

impl RetryPolicy for FixedInterval {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// No delay. Lets tests exercise the attempt budget without sleeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Immediate;

impl RetryPolicy for Immediate {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Doubling delay starting at `initial`, capped at `max`.
///
/// # Invariants
/// - `initial` must not exceed `max`
/// - `initial` must be at least 1 millisecond
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Escalating {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Escalating {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(4),
        }
    }
}

impl Escalating {
    /// Clamp delays to at least 1ms and ensure `initial <= max`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use msgscenario::correlate::Escalating;
    ///
    /// let policy = Escalating {
    ///     initial: Duration::from_millis(5),
    ///     max: Duration::from_millis(1),
    /// }
    /// .normalized();
    /// assert_eq!(policy.initial, Duration::from_millis(1));
    /// assert_eq!(policy.max, Duration::from_millis(5));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.initial = self.initial.max(Duration::from_millis(1));
        self.max = self.max.max(Duration::from_millis(1));
        if self.initial > self.max {
            std::mem::swap(&mut self.initial, &mut self.max);
        }
        self
    }
}

impl RetryPolicy for Escalating {
    fn delay(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        self.initial
            .checked_mul(1u32 << doublings)
            .unwrap_or(self.max)
            .min(self.max)
    }
}
