use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::time::{frames_to_nanos, micros_to_nanos, Clock, TimestampNanos};

/// Slack absorbing synchronization noise between the audio engine's timing
/// model and the host clock.
pub const JITTER_COMPENSATION: Duration = Duration::from_micros(500);

/// The engine could not report its cycle times. The adapter logs the
/// underlying cause before mapping into this.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cycle times unavailable from the audio engine")]
pub struct CycleTimesError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleTimes {
  /// Frames elapsed since the start of the current cycle.
  pub frames_since_cycle_start: u32,
  /// The engine's current best estimate of the cycle period, in microseconds.
  pub period_usecs: f32,
}

/// The audio-engine seam for the scheduler's slow path, queried only when
/// the cached projection has drifted.
pub trait CycleTiming {
  fn cycle_times(&self) -> Result<CycleTimes, CycleTimesError>;
}

/// Computes, once per cycle, the instant up to which queued events belong to
/// the current cycle.
///
/// Owned by the realtime callback; no locking, no allocation.
pub struct CycleScheduler<C> {
  clock: Arc<C>,
  sample_rate: u32,
  previous_deadline: TimestampNanos,
  cycle_length: u64,
  reset_count: u32,
}

impl<C: Clock> CycleScheduler<C> {
  pub fn new(clock: Arc<C>, sample_rate: u32) -> Self {
    Self {
      clock,
      sample_rate,
      previous_deadline: 0,
      cycle_length: 0,
      reset_count: 0,
    }
  }

  /// Zero the timing state, forcing a resync on the next call. Called on
  /// activation and after any detected fault.
  pub fn invalidate(&mut self) {
    self.previous_deadline = 0;
    self.cycle_length = 0;
    self.reset_count = 0;
  }

  /// Current cycle-period estimate in nanoseconds (zero until the first
  /// resync).
  pub fn cycle_length(&self) -> u64 {
    self.cycle_length
  }

  /// How often the timing had to be re-synchronized. Ideally stays at one
  /// for an entire session.
  pub fn reset_count(&self) -> u32 {
    self.reset_count
  }

  /// The deadline for events to be consumed in the current cycle.
  ///
  /// Never returns a value greater than `clock.now()`.
  pub fn new_deadline(&mut self, timing: &impl CycleTiming) -> TimestampNanos {
    // Fast path: one cycle further than last time.
    let tentative = self.previous_deadline + self.cycle_length;
    if self.is_plausible(tentative) {
      self.previous_deadline = tentative;
      return tentative;
    }
    self.resync(timing)
  }

  /// A deadline is plausible iff it lies within the previous cycle:
  /// stalled callbacks fail the lower bound, a deadline that ran ahead of
  /// the present fails the upper one.
  fn is_plausible(&self, deadline: TimestampNanos) -> bool {
    if self.cycle_length == 0 {
      return false; // no estimate yet
    }
    let now = self.clock.now();
    if deadline >= now {
      return false;
    }
    let earliest = now.saturating_sub(self.cycle_length + jitter_nanos());
    deadline >= earliest
  }

  fn resync(&mut self, timing: &impl CycleTiming) -> TimestampNanos {
    self.reset_count += 1;
    let times = match timing.cycle_times() {
      Ok(times) => times,
      Err(err) => {
        // Safe over-approximation: nothing in the queue can exceed the
        // present. The state stays zeroed so the next call resyncs again.
        log::warn!("Timing resync failed: {err}");
        self.previous_deadline = 0;
        self.cycle_length = 0;
        return self.clock.now();
      }
    };
    self.cycle_length = micros_to_nanos(times.period_usecs);
    let elapsed = frames_to_nanos(times.frames_since_cycle_start, self.sample_rate);
    let deadline = self
      .clock
      .now()
      .saturating_sub(elapsed + jitter_nanos());
    self.previous_deadline = deadline;
    log::trace!(
      "Timing resync #{}: cycle length {} us",
      self.reset_count,
      self.cycle_length / 1_000
    );
    deadline
  }
}

fn jitter_nanos() -> u64 {
  JITTER_COMPENSATION.as_nanos() as u64
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{ManualClock, ScriptedTiming};

  const SAMPLE_RATE: u32 = 48_000;
  const PERIOD_USECS: f32 = 10_000.0; // 480 frames at 48 kHz
  const PERIOD_NANOS: u64 = 10_000_000;

  fn regular_timing() -> ScriptedTiming {
    ScriptedTiming::always(CycleTimes {
      frames_since_cycle_start: 0,
      period_usecs: PERIOD_USECS,
    })
  }

  fn scheduler(clock: &Arc<ManualClock>) -> CycleScheduler<ManualClock> {
    CycleScheduler::new(clock.clone(), SAMPLE_RATE)
  }

  #[test]
  fn first_call_takes_the_slow_path() {
    let clock = Arc::new(ManualClock::new(1_000_000_000));
    let mut scheduler = scheduler(&clock);
    let timing = regular_timing();

    let deadline = scheduler.new_deadline(&timing);
    assert_eq!(scheduler.reset_count(), 1);
    assert_eq!(scheduler.cycle_length(), PERIOD_NANOS);
    assert_eq!(deadline, 1_000_000_000 - 500_000);
  }

  #[test]
  fn regular_cycles_resync_at_most_once() {
    let clock = Arc::new(ManualClock::new(1_000_000_000));
    let mut scheduler = scheduler(&clock);
    let timing = regular_timing();

    let mut previous = scheduler.new_deadline(&timing);
    for _ in 0..100 {
      clock.advance(Duration::from_micros(10_000));
      let deadline = scheduler.new_deadline(&timing);
      assert_eq!(deadline, previous + PERIOD_NANOS);
      previous = deadline;
    }
    assert_eq!(scheduler.reset_count(), 1);
  }

  #[test]
  fn never_returns_a_deadline_beyond_now() {
    let clock = Arc::new(ManualClock::new(2_000_000_000));
    let mut scheduler = scheduler(&clock);
    let timing = regular_timing();

    for _ in 0..50 {
      let deadline = scheduler.new_deadline(&timing);
      assert!(deadline <= clock.now());
      clock.advance(Duration::from_micros(10_000));
    }
  }

  #[test]
  fn an_xrun_forces_a_resync() {
    let clock = Arc::new(ManualClock::new(1_000_000_000));
    let mut scheduler = scheduler(&clock);
    let timing = regular_timing();

    scheduler.new_deadline(&timing);
    clock.advance(Duration::from_micros(10_000));
    scheduler.new_deadline(&timing);
    assert_eq!(scheduler.reset_count(), 1);

    // The callback misses by two cycle lengths.
    clock.advance(Duration::from_micros(30_000));
    let deadline = scheduler.new_deadline(&timing);
    assert_eq!(scheduler.reset_count(), 2);

    let now = clock.now();
    assert!(deadline < now);
    assert!(deadline >= now - PERIOD_NANOS - 500_000);
  }

  #[test]
  fn a_deadline_ahead_of_now_forces_a_resync() {
    let clock = Arc::new(ManualClock::new(1_000_000_000));
    let mut scheduler = scheduler(&clock);
    let timing = regular_timing();

    scheduler.new_deadline(&timing);
    // The clock does not advance: the projected deadline would land in the
    // future relative to now.
    let deadline = scheduler.new_deadline(&timing);
    assert_eq!(scheduler.reset_count(), 2);
    assert!(deadline <= clock.now());
  }

  #[test]
  fn frames_into_the_cycle_shift_the_deadline_back() {
    let clock = Arc::new(ManualClock::new(5_000_000_000));
    let mut scheduler = scheduler(&clock);
    let timing = ScriptedTiming::always(CycleTimes {
      frames_since_cycle_start: 48, // 1 ms at 48 kHz
      period_usecs: PERIOD_USECS,
    });

    let deadline = scheduler.new_deadline(&timing);
    assert_eq!(deadline, 5_000_000_000 - 1_000_000 - 500_000);
  }

  #[test]
  fn failed_resync_returns_now_and_resyncs_next_time() {
    let clock = Arc::new(ManualClock::new(1_000_000_000));
    let mut scheduler = scheduler(&clock);
    let timing = ScriptedTiming::sequence(
      vec![Err(CycleTimesError)],
      Ok(CycleTimes {
        frames_since_cycle_start: 0,
        period_usecs: PERIOD_USECS,
      }),
    );

    let deadline = scheduler.new_deadline(&timing);
    assert_eq!(deadline, clock.now());
    assert_eq!(scheduler.cycle_length(), 0);

    clock.advance(Duration::from_micros(10_000));
    scheduler.new_deadline(&timing);
    assert_eq!(scheduler.reset_count(), 2);
    assert_eq!(scheduler.cycle_length(), PERIOD_NANOS);
  }

  #[test]
  fn invalidate_zeroes_the_state() {
    let clock = Arc::new(ManualClock::new(1_000_000_000));
    let mut scheduler = scheduler(&clock);
    let timing = regular_timing();

    scheduler.new_deadline(&timing);
    scheduler.invalidate();
    assert_eq!(scheduler.reset_count(), 0);
    assert_eq!(scheduler.cycle_length(), 0);

    clock.advance(Duration::from_micros(10_000));
    scheduler.new_deadline(&timing);
    assert_eq!(scheduler.reset_count(), 1);
  }
}
