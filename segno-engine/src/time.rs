use std::time::Instant;

/// A point on the host's monotonic clock, in nanoseconds.
///
/// Timestamps are never derived from wall-clock-of-day; they only compare
/// meaningfully against other timestamps taken from the same `Clock`.
pub type TimestampNanos = u64;

pub const NANOS_PER_SEC: u64 = 1_000_000_000;
pub const NANOS_PER_MICRO: u64 = 1_000;

pub trait Clock: Send + Sync + 'static {
  fn now(&self) -> TimestampNanos;
}

/// Host monotonic time, anchored at construction.
///
/// All parts of a session (queue, scheduler, dispatcher) must share one
/// instance, otherwise their timestamps live on different axes.
pub struct MonotonicClock {
  epoch: Instant,
}

impl MonotonicClock {
  pub fn new() -> Self {
    Self {
      epoch: Instant::now(),
    }
  }
}

impl Default for MonotonicClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for MonotonicClock {
  fn now(&self) -> TimestampNanos {
    self.epoch.elapsed().as_nanos() as TimestampNanos
  }
}

pub fn frames_to_nanos(frames: u32, sample_rate: u32) -> u64 {
  u64::from(frames) * NANOS_PER_SEC / u64::from(sample_rate)
}

pub fn nanos_to_frames(nanos: u64, sample_rate: u32) -> u64 {
  nanos * u64::from(sample_rate) / NANOS_PER_SEC
}

pub fn micros_to_nanos(micros: f32) -> u64 {
  (f64::from(micros) * NANOS_PER_MICRO as f64) as u64
}
