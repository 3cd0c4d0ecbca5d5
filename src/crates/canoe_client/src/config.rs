use std::collections::BTreeSet;
use std::time::Duration;

use tracing::Level;

use crate::poll::PollPolicy;

/// Construction-time settings for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// CAPL functions the session is allowed to call.
    pub user_capl_functions: BTreeSet<String>,
    /// Delay between readiness checks while a measurement starts or stops.
    pub poll_interval: Duration,
    /// Upper bound on how long a measurement start or stop may take.
    pub measurement_timeout: Duration,
    /// Verbosity of the fmt subscriber installed on construction; `None` leaves
    /// subscriber setup to the caller.
    pub log_level: Option<Level>,
}

impl ClientConfig {
    /// Create a config with an empty allow-list and default timings.
    pub fn new() -> Self {
        Self {
            user_capl_functions: BTreeSet::new(),
            poll_interval: Duration::from_millis(100),
            measurement_timeout: Duration::from_secs(5),
            log_level: None,
        }
    }

    /// Allow calling a CAPL function by name.
    pub fn with_capl_function(mut self, name: impl Into<String>) -> Self {
        self.user_capl_functions.insert(name.into());
        self
    }

    /// Allow calling every listed CAPL function.
    pub fn with_capl_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_capl_functions
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Override the measurement readiness poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the measurement start/stop timeout.
    pub fn with_measurement_timeout(mut self, timeout: Duration) -> Self {
        self.measurement_timeout = timeout;
        self
    }

    /// Install a fmt subscriber at this level when the session is built.
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Whether `name` is on the CAPL allow-list.
    pub fn allows(&self, name: &str) -> bool {
        self.user_capl_functions.contains(name)
    }

    /// Readiness policy used for measurement transitions.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.poll_interval, self.measurement_timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
