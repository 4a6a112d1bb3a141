use std::time::Duration;

use tokio::time::Instant;

/// The point in time by which the current request must have answered.
///
/// Sub-operations never get a fresh independent timeout; they get a slice of
/// what is left, see [`Deadline::budget`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    /// No parent deadline, e.g. background work.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Timeout for a sub-operation that wants `reserve`.
    ///
    /// `min(remaining - reserve, reserve)` under a deadline, so the caller
    /// keeps `reserve` for its own cleanup; `reserve` without one. An exhausted
    /// deadline yields zero and the sub-operation times out immediately.
    pub fn budget(&self, reserve: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => remaining.saturating_sub(reserve).min(reserve),
            None => reserve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_budget_shrinks_with_parent() {
        let reserve = Duration::from_secs(3);
        assert_eq!(Deadline::none().budget(reserve), reserve);
        assert_eq!(Deadline::after(Duration::from_secs(30)).budget(reserve), reserve);
        assert_eq!(
            Deadline::after(Duration::from_secs(5)).budget(reserve),
            Duration::from_secs(2)
        );
        assert_eq!(Deadline::after(Duration::from_secs(2)).budget(reserve), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down() {
        let deadline = Deadline::after(Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(deadline.remaining(), Some(Duration::from_secs(6)));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }
}
