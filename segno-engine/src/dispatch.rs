use std::sync::Arc;

use thiserror::Error;

use crate::queue::{QueueError, ReceiverQueue};
use crate::scheduler::{CycleScheduler, CycleTiming};
use crate::source::EventSource;
use crate::time::{nanos_to_frames, Clock, TimestampNanos};

#[derive(Error, Debug)]
pub enum DispatchError<E: std::error::Error> {
  /// An event mapped strictly beyond the current cycle buffer, which means
  /// the deadline ran ahead of the engine's own timing.
  #[error("Event offset {offset} beyond the cycle of {frame_count} frames")]
  OffsetBeyondCycle { offset: u64, frame_count: u32 },

  #[error(transparent)]
  Queue(#[from] QueueError<E>),
}

/// Glue executed once per audio cycle: compute the deadline, drain the
/// queue, and hand each event to the sink tagged with its sample-frame
/// offset inside the cycle buffer.
pub struct CycleDispatcher<C> {
  scheduler: CycleScheduler<C>,
  sample_rate: u32,
}

impl<C: Clock> CycleDispatcher<C> {
  pub fn new(clock: Arc<C>, sample_rate: u32) -> Self {
    Self {
      scheduler: CycleScheduler::new(clock, sample_rate),
      sample_rate,
    }
  }

  /// Zero the cycle timing, forcing a resync on the next cycle. Called on
  /// activation.
  pub fn invalidate_timing(&mut self) {
    self.scheduler.invalidate();
  }

  pub fn reset_count(&self) -> u32 {
    self.scheduler.reset_count()
  }

  pub fn run_cycle<S, T, F>(
    &mut self,
    queue: &ReceiverQueue<S, C>,
    timing: &T,
    frame_count: u32,
    mut sink: F,
  ) -> Result<(), DispatchError<S::Error>>
  where
    S: EventSource,
    T: CycleTiming,
    F: FnMut(&S::Event, u32),
  {
    let deadline = self.scheduler.new_deadline(timing);
    // In wall-clock terms the cycle buffer spans one cycle length up to the
    // deadline.
    let cycle_start = deadline.saturating_sub(self.scheduler.cycle_length());
    let sample_rate = self.sample_rate;

    let mut fault = None;
    queue.drain_until(deadline, |event, timestamp| {
      let offset = frame_offset(timestamp, cycle_start, sample_rate, frame_count);
      match offset {
        Ok(offset) => sink(event, offset),
        Err(err) => {
          // The batch is already consumed; keep draining and report the
          // first fault afterwards.
          if fault.is_none() {
            fault = Some(err);
          }
        }
      }
    })?;

    match fault {
      None => Ok(()),
      Some(fault) => Err(fault),
    }
  }
}

/// Map an event timestamp to a frame offset within the current cycle.
///
/// Events slightly older than the cycle start (within jitter tolerance)
/// clamp to frame zero; an event exactly at the deadline clamps to the last
/// frame; anything strictly beyond the cycle is a scheduler bug.
fn frame_offset<E: std::error::Error>(
  timestamp: TimestampNanos,
  cycle_start: TimestampNanos,
  sample_rate: u32,
  frame_count: u32,
) -> Result<u32, DispatchError<E>> {
  let frames = nanos_to_frames(timestamp.saturating_sub(cycle_start), sample_rate);
  if frames > u64::from(frame_count) {
    return Err(DispatchError::OffsetBeyondCycle {
      offset: frames,
      frame_count,
    });
  }
  Ok((frames as u32).min(frame_count.saturating_sub(1)))
}
