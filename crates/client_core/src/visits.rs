use std::{
    fmt::Display,
    future::Future,
    time::{Duration, Instant},
};

use tracing::{info, warn};
use uuid::Uuid;

/// Visit-tracking state for one browsing session.
///
/// Created when the session starts and only touched by the visit tracker.
#[derive(Debug, Clone)]
pub struct VisitSession {
    session_key: Uuid,
    tracked: bool,
    last_counted: Option<Instant>,
    revisit_after: Duration,
}

impl VisitSession {
    pub fn start(revisit_after: Duration) -> Self {
        Self {
            session_key: Uuid::new_v4(),
            tracked: false,
            last_counted: None,
            revisit_after,
        }
    }

    pub fn session_key(&self) -> Uuid {
        self.session_key
    }

    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// `true` exactly once per session.
    pub fn claim_session_visit(&mut self, now: Instant) -> bool {
        if self.tracked {
            return false;
        }
        self.tracked = true;
        self.last_counted = Some(now);
        true
    }

    /// `true` when the page became visible again after `revisit_after`.
    pub fn claim_return_visit(&mut self, now: Instant) -> bool {
        let due = match self.last_counted {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.revisit_after,
        };
        if due {
            self.last_counted = Some(now);
        }
        due
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` attempts failed.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(label, attempt, "retry: succeeded after transient failure");
                }
                return Ok(value);
            }
            Err(err) if attempt < max_attempts => {
                warn!(label, attempt, max_attempts, error = %err, "retry: attempt failed");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(label, attempt, max_attempts, error = %err, "retry: giving up");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn session_visit_counts_once() {
        let now = Instant::now();
        let mut session = VisitSession::start(Duration::from_secs(300));
        assert!(session.claim_session_visit(now));
        assert!(!session.claim_session_visit(now + Duration::from_secs(1)));
        assert!(session.is_tracked());
    }

    #[test]
    fn return_visit_needs_the_revisit_window_to_pass() {
        let now = Instant::now();
        let mut session = VisitSession::start(Duration::from_secs(300));
        session.claim_session_visit(now);

        assert!(!session.claim_return_visit(now + Duration::from_secs(300)));
        assert!(session.claim_return_visit(now + Duration::from_secs(301)));
        assert!(!session.claim_return_visit(now + Duration::from_secs(302)));
    }

    #[test]
    fn sessions_get_distinct_keys() {
        let a = VisitSession::start(Duration::from_secs(1));
        let b = VisitSession::start(Duration::from_secs(1));
        assert_ne!(a.session_key(), b.session_key());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_stops_at_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        };
        let counter = Arc::clone(&calls);
        let result: Result<u32, String> = retry(policy, "test", move |attempt| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(format!("transient {attempt}"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_is_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        };
        let result: Result<(), String> = retry(policy, "test", move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            }
        })
        .await;

        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
