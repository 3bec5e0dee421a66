use std::time::Duration;

use crate::time::TimestampNanos;

/// The seam between the receiver queue and whatever produces events.
///
/// The listener owns the source for the lifetime of a session and moves it
/// from one listener thread to the next, so implementations only need `Send`.
pub trait EventSource: Send + 'static {
  type Event: Send + 'static;
  type Error: std::error::Error + Send + 'static;

  /// Block for at most `timeout` until the source has readable input.
  ///
  /// Returns `Ok(true)` when a subsequent `drain` may yield events,
  /// `Ok(false)` on timeout. Spurious `Ok(true)` is allowed.
  fn wait_readable(&mut self, timeout: Duration) -> Result<bool, Self::Error>;

  /// Remove everything currently queued on the source, in arrival order.
  ///
  /// Must not block once `wait_readable` reported readable input. An empty
  /// result is not an error.
  fn drain(&mut self) -> Result<Vec<Self::Event>, Self::Error>;
}

/// Events drained from the source in one non-blocking pull, sharing the
/// instant at which they left the source's FIFO.
///
/// `events` is never empty: an empty drain produces no batch at all.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch<T> {
  pub timestamp: TimestampNanos,
  pub events: Vec<T>,
}
