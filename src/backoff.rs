//! Polling schedule for awaiting agent tasks.

use std::time::Duration;

use tokio::time::Instant;

/// Shortest delay ever handed out, so polling can never spin.
pub const MIN_POLL_DELAY: Duration = Duration::from_millis(100);

/// Doubling poll interval with a cap and a wall-clock wait budget.
///
/// The budget is measured from construction, so time spent in the status
/// requests themselves counts against it.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    current: Duration,
    max: Duration,
    budget: Duration,
    started: Instant,
}

impl PollBackoff {
    /// Starts at `initial`, doubles up to `max`, gives up after `budget`.
    ///
    /// Both `initial` and `max` are raised to at least [`MIN_POLL_DELAY`].
    pub fn new(initial: Duration, max: Duration, budget: Duration) -> Self {
        let max = max.max(MIN_POLL_DELAY);
        Self {
            current: initial.clamp(MIN_POLL_DELAY, max),
            max,
            budget,
            started: Instant::now(),
        }
    }

    /// Returns the next delay, or `None` once the budget is spent.
    ///
    /// The final delay is shortened so the total never exceeds the budget.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let remaining = self.budget.checked_sub(self.started.elapsed())?;
        if remaining.is_zero() {
            return None;
        }
        let delay = self.current.min(remaining);
        self.current = (self.current * 2).min(self.max);
        Some(delay)
    }

    /// Time elapsed since polling started.
    pub fn waited(&self) -> Duration {
        self.started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, sleep};

    #[tokio::test(start_paused = true)]
    async fn delays_double_until_capped() {
        let mut backoff = PollBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(4),
            Duration::from_secs(100),
        );
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_stops_polling() {
        let mut backoff = PollBackoff::new(
            Duration::from_secs(2),
            Duration::from_secs(2),
            Duration::from_secs(5),
        );
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        advance(Duration::from_secs(2)).await;
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        advance(Duration::from_secs(2)).await;
        // 1s left of the budget
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
        advance(Duration::from_secs(1)).await;
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.waited(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn time_outside_delays_counts_against_budget() {
        let mut backoff = PollBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::from_secs(3),
        );
        // A slow status request eats most of the budget.
        advance(Duration::from_millis(2_500)).await;
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(500)));
        advance(Duration::from_millis(500)).await;
        assert_eq!(backoff.next_delay(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_initial_delay_still_terminates() {
        let mut backoff = PollBackoff::new(
            Duration::ZERO,
            Duration::ZERO,
            Duration::from_secs(1),
        );
        let mut polls = 0;
        while let Some(delay) = backoff.next_delay() {
            assert_eq!(delay, MIN_POLL_DELAY);
            sleep(delay).await;
            polls += 1;
            assert!(polls <= 10, "backoff did not respect its budget");
        }
        assert_eq!(polls, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_above_max_is_clamped() {
        let mut backoff = PollBackoff::new(
            Duration::from_secs(10),
            Duration::from_secs(3),
            Duration::from_secs(60),
        );
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_never_polls() {
        let mut backoff = PollBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(1),
            Duration::ZERO,
        );
        assert_eq!(backoff.next_delay(), None);
    }
}
