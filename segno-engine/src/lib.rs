pub(crate) mod config;
pub(crate) mod dispatch;
pub(crate) mod queue;
pub(crate) mod scheduler;
pub(crate) mod source;
pub(crate) mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use config::QueueConfig;
pub use dispatch::{CycleDispatcher, DispatchError};
pub use queue::{QueueError, ReceiverQueue, State};
pub use scheduler::{
  CycleScheduler, CycleTimes, CycleTimesError, CycleTiming, JITTER_COMPENSATION,
};
pub use source::{EventBatch, EventSource};
pub use time::{
  frames_to_nanos, micros_to_nanos, nanos_to_frames, Clock, MonotonicClock, TimestampNanos,
};
