use std::thread;
use std::time::{Duration, Instant};

/// Interval and upper bound for a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            timeout,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(5))
    }
}

/// Outcome of [`wait_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready { elapsed: Duration },
    TimedOut { waited: Duration },
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

/// Evaluate `predicate` until it returns `true` or the policy's timeout passes.
///
/// The predicate is always evaluated at least once, and once more at the deadline,
/// so a zero timeout degenerates to a single check. Errors from the predicate end
/// the wait immediately.
pub fn wait_until<E, F>(policy: PollPolicy, mut predicate: F) -> Result<Readiness, E>
where
    F: FnMut() -> Result<bool, E>,
{
    let start = Instant::now();
    loop {
        if predicate()? {
            return Ok(Readiness::Ready {
                elapsed: start.elapsed(),
            });
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            return Ok(Readiness::TimedOut { waited: elapsed });
        }
        thread::sleep(policy.interval.min(policy.timeout - elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_clamped_to_one_millisecond() {
        let policy = PollPolicy::new(Duration::ZERO, Duration::from_secs(1));
        assert_eq!(policy.interval, Duration::from_millis(1));
        assert_eq!(policy.timeout, Duration::from_secs(1));
    }

    #[test]
    fn returns_ready_once_predicate_holds() {
        let policy = PollPolicy::new(Duration::from_millis(1), Duration::from_secs(1));
        let mut calls = 0;
        let outcome = wait_until::<(), _>(policy, || {
            calls += 1;
            Ok(calls == 3)
        })
        .unwrap();

        assert!(outcome.is_ready());
        assert_eq!(calls, 3);
    }

    #[test]
    fn times_out_when_predicate_never_holds() {
        let policy = PollPolicy::new(Duration::from_millis(5), Duration::from_millis(30));
        let outcome = wait_until::<(), _>(policy, || Ok(false)).unwrap();

        match outcome {
            Readiness::TimedOut { waited } => assert!(waited >= Duration::from_millis(30)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_checks_exactly_once() {
        let policy = PollPolicy::new(Duration::from_millis(5), Duration::ZERO);
        let mut calls = 0;
        let outcome = wait_until::<(), _>(policy, || {
            calls += 1;
            Ok(false)
        })
        .unwrap();

        assert!(!outcome.is_ready());
        assert_eq!(calls, 1);
    }

    #[test]
    fn predicate_errors_stop_the_wait() {
        let policy = PollPolicy::default();
        let result = wait_until(policy, || Err::<bool, _>("gone"));
        assert_eq!(result, Err("gone"));
    }
}
