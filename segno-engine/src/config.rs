use std::time::Duration;

#[derive(Debug, Clone)]
pub struct QueueConfig {
  /// Upper bound on the listener's poll timeout, and therefore on the wake
  /// latency of a stop request.
  pub shutdown_poll_period: Duration,
}

impl QueueConfig {
  pub const DEFAULT_SHUTDOWN_POLL_PERIOD: Duration = Duration::from_millis(10);
}

impl Default for QueueConfig {
  fn default() -> Self {
    Self {
      shutdown_poll_period: QueueConfig::DEFAULT_SHUTDOWN_POLL_PERIOD,
    }
  }
}
