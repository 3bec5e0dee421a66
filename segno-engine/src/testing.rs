//! Hand-rolled doubles for the trait seams, shared by the module tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::scheduler::{CycleTimes, CycleTimesError, CycleTiming};
use crate::source::EventSource;
use crate::time::{Clock, TimestampNanos};

/// A clock the test advances by hand.
pub(crate) struct ManualClock {
  now: AtomicU64,
}

impl ManualClock {
  pub fn new(start: TimestampNanos) -> Self {
    Self {
      now: AtomicU64::new(start),
    }
  }

  pub fn advance(&self, delta: Duration) {
    self.now.fetch_add(delta.as_nanos() as u64, Ordering::SeqCst);
  }

  pub fn set(&self, now: TimestampNanos) {
    self.now.store(now, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> TimestampNanos {
    self.now.load(Ordering::SeqCst)
  }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{0}")]
pub(crate) struct TestSourceError(pub &'static str);

#[derive(Default)]
struct SourceState {
  pending: VecDeque<u32>,
  fail_drain: Option<TestSourceError>,
}

type Shared = Arc<(Mutex<SourceState>, Condvar)>;

/// An event source the test feeds from outside through a [`TestFeed`].
pub(crate) struct TestSource(Shared);

pub(crate) struct TestFeed(Shared);

impl TestSource {
  pub fn new() -> (TestSource, TestFeed) {
    let shared: Shared = Arc::new((Mutex::new(SourceState::default()), Condvar::new()));
    (TestSource(shared.clone()), TestFeed(shared))
  }
}

impl TestFeed {
  /// Make `events` available as one readable burst.
  pub fn push(&self, events: Vec<u32>) {
    let (state, ready) = &*self.0;
    state.lock().pending.extend(events);
    ready.notify_all();
  }

  /// Make the next drain fail fatally.
  pub fn fail(&self, err: TestSourceError) {
    let (state, ready) = &*self.0;
    state.lock().fail_drain = Some(err);
    ready.notify_all();
  }
}

impl EventSource for TestSource {
  type Event = u32;
  type Error = TestSourceError;

  fn wait_readable(&mut self, timeout: Duration) -> Result<bool, Self::Error> {
    let (state, ready) = &*self.0;
    let mut state = state.lock();
    if state.pending.is_empty() && state.fail_drain.is_none() {
      ready.wait_for(&mut state, timeout);
    }
    Ok(!state.pending.is_empty() || state.fail_drain.is_some())
  }

  fn drain(&mut self) -> Result<Vec<Self::Event>, Self::Error> {
    let (state, _) = &*self.0;
    let mut state = state.lock();
    if let Some(err) = state.fail_drain.take() {
      return Err(err);
    }
    Ok(state.pending.drain(..).collect())
  }
}

/// Scripted cycle-timing answers, consumed in order; `fallback` repeats once
/// the script runs dry.
pub(crate) struct ScriptedTiming {
  script: Mutex<VecDeque<Result<CycleTimes, CycleTimesError>>>,
  fallback: Result<CycleTimes, CycleTimesError>,
}

impl ScriptedTiming {
  pub fn always(times: CycleTimes) -> Self {
    Self::sequence(Vec::new(), Ok(times))
  }

  pub fn sequence(
    script: Vec<Result<CycleTimes, CycleTimesError>>,
    fallback: Result<CycleTimes, CycleTimesError>,
  ) -> Self {
    Self {
      script: Mutex::new(script.into()),
      fallback,
    }
  }
}

impl CycleTiming for ScriptedTiming {
  fn cycle_times(&self) -> Result<CycleTimes, CycleTimesError> {
    self
      .script
      .lock()
      .pop_front()
      .unwrap_or(self.fallback)
  }
}
