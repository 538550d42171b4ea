use core::time::Duration;

/// How long a session waits for the next response byte.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Minimum spacing between two commands. The sensor stops answering when
/// frames arrive back-to-back.
pub const DEFAULT_COMMAND_INTERVAL: Duration = Duration::from_millis(10);

/// Timing settings for a [`Session`](crate::Session).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum silence on the channel while a frame is being read.
    pub timeout: Duration,
    /// Minimum time between the starts of two consecutive writes.
    pub command_interval: Duration,
}

impl SessionConfig {
    pub fn new(timeout: Duration, command_interval: Duration) -> Self {
        SessionConfig {
            timeout,
            command_interval,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_interval(mut self, command_interval: Duration) -> Self {
        self.command_interval = command_interval;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::new(DEFAULT_TIMEOUT, DEFAULT_COMMAND_INTERVAL)
    }
}
