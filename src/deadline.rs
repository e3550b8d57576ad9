//! Bounded deadline for backend calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on a single vector-search call.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Absolute point by which an inbound request must be answered.
///
/// Outer components may insert this into the request extensions; the search handler
/// folds it into the backend [`Deadline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDeadline(pub Instant);

/// The call outran its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline exceeded after {elapsed:?} (budget: {budget:?})")]
pub struct DeadlineExceeded {
    pub elapsed: Duration,
    pub budget: Duration,
}

/// One combined expiration signal: the earlier of a fixed ceiling and the caller's own
/// deadline. It is handed explicitly to the backend call rather than racing two timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    start: Instant,
    at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        let start = Instant::now();
        Self { start, at: start + budget }
    }

    /// Earlier of `now + ceiling` and `inbound`, when the caller supplied one.
    pub fn bounded(ceiling: Duration, inbound: Option<RequestDeadline>) -> Self {
        let mut deadline = Self::after(ceiling);
        if let Some(RequestDeadline(at)) = inbound {
            deadline.at = deadline.at.min(at.max(deadline.start));
        }
        deadline
    }

    /// Total budget granted when the deadline was created.
    pub fn budget(&self) -> Duration {
        self.at.saturating_duration_since(self.start)
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Drive `fut` to completion or abandon it at the deadline. Dropping the future cancels
    /// the in-flight work.
    pub async fn run<F>(self, fut: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(out) => Ok(out),
            Err(_) => Err(DeadlineExceeded { elapsed: self.start.elapsed(), budget: self.budget() }),
        }
    }
}
