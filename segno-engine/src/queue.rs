use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::QueueConfig;
use crate::source::{EventBatch, EventSource};
use crate::time::{Clock, TimestampNanos};

#[derive(Error, Debug)]
pub enum QueueError<E: std::error::Error> {
  #[error("Receiver queue is already running")]
  AlreadyRunning,

  #[error("Failed to spawn the listener thread: {0}")]
  Spawn(std::io::Error),

  #[error("Event source: {0}")]
  Source(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Stopped,
  Running,
}

/// What a one-shot slot can hold.
///
/// `Waiting` means the listener for this slot is still blocked in poll.
/// `Ready` carries the batch together with the handle to the successor slot,
/// so a consumer never observes a node without a live next handle.
enum SlotState<S: EventSource> {
  Waiting,
  Ready(Box<Node<S>>),
  Interrupted,
  Failed(S::Error),
}

struct Node<S: EventSource> {
  batch: EventBatch<S::Event>,
  next: SlotHandle<S>,
  _live: LiveGuard,
}

/// Keeps the diagnostic count of unconsumed batches in step with node
/// lifetimes.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
  fn new(count: &Arc<AtomicUsize>) -> Self {
    count.fetch_add(1, Ordering::SeqCst);
    Self(count.clone())
  }
}

impl Drop for LiveGuard {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::SeqCst);
  }
}

struct Slot<S: EventSource> {
  state: Mutex<SlotState<S>>,
}

/// Shared handle to a slot. The listener fulfills it exactly once; whoever
/// holds the queue head consumes it exactly once. Fulfillment takes only the
/// slot's own lock, never the queue lock.
struct SlotHandle<S: EventSource>(Arc<Slot<S>>);

impl<S: EventSource> Clone for SlotHandle<S> {
  fn clone(&self) -> Self {
    Self(self.0.clone())
  }
}

impl<S: EventSource> SlotHandle<S> {
  fn waiting() -> Self {
    Self(Arc::new(Slot {
      state: Mutex::new(SlotState::Waiting),
    }))
  }

  fn ready(node: Box<Node<S>>) -> Self {
    Self(Arc::new(Slot {
      state: Mutex::new(SlotState::Ready(node)),
    }))
  }

  fn is_ready(&self) -> bool {
    matches!(&*self.0.state.lock(), SlotState::Ready(_))
  }

  fn fulfill(&self, node: Box<Node<S>>) {
    *self.0.state.lock() = SlotState::Ready(node);
  }

  fn interrupt(&self) {
    *self.0.state.lock() = SlotState::Interrupted;
  }

  fn fail(&self, err: S::Error) {
    *self.0.state.lock() = SlotState::Failed(err);
  }

  /// Non-blocking: `None` while the slot is still waiting.
  fn try_take(&self) -> Option<SlotState<S>> {
    let mut state = self.0.state.lock();
    match &*state {
      SlotState::Waiting => None,
      _ => Some(std::mem::replace(&mut *state, SlotState::Waiting)),
    }
  }
}

struct ListenerContext<C> {
  clock: Arc<C>,
  carry_on: Arc<AtomicBool>,
  live_batches: Arc<AtomicUsize>,
  poll_period: Duration,
}

impl<C> Clone for ListenerContext<C> {
  fn clone(&self) -> Self {
    Self {
      clock: self.clock.clone(),
      carry_on: self.carry_on.clone(),
      live_batches: self.live_batches.clone(),
      poll_period: self.poll_period,
    }
  }
}

struct Inner<S: EventSource> {
  head: Option<SlotHandle<S>>,
  state: State,
}

/// FIFO chain of timestamped event batches fed by a background listener.
///
/// The queue lock protects only the head handle and the state flag. Chain
/// nodes are single-consumer handoffs: once published by a listener they are
/// touched by exactly one reader.
pub struct ReceiverQueue<S: EventSource, C: Clock = crate::time::MonotonicClock> {
  inner: Mutex<Inner<S>>,
  carry_on: Arc<AtomicBool>,
  live_batches: Arc<AtomicUsize>,
  clock: Arc<C>,
  shutdown_poll_period: Duration,
}

impl<S: EventSource, C: Clock> ReceiverQueue<S, C> {
  pub fn new(clock: Arc<C>) -> Self {
    Self::with_config(clock, QueueConfig::default())
  }

  pub fn with_config(clock: Arc<C>, config: QueueConfig) -> Self {
    Self {
      inner: Mutex::new(Inner {
        head: None,
        state: State::Stopped,
      }),
      carry_on: Arc::new(AtomicBool::new(false)),
      live_batches: Arc::new(AtomicUsize::new(0)),
      clock,
      shutdown_poll_period: config.shutdown_poll_period,
    }
  }

  /// Start listening on `source`.
  ///
  /// The source moves into the listener and travels from one listener thread
  /// to the next until `stop`. Starting an already running queue stops it
  /// and reports the caller error.
  pub fn start(&self, source: S) -> Result<(), QueueError<S::Error>> {
    let mut inner = self.inner.lock();
    if inner.state == State::Running {
      log::error!("Attempt to start the receiver queue twice");
      self.stop_locked(&mut inner);
      return Err(QueueError::AlreadyRunning);
    }
    self.carry_on.store(true, Ordering::SeqCst);
    let head = SlotHandle::waiting();
    if let Err(err) = spawn_listener(source, head.clone(), self.listener_context()) {
      self.carry_on.store(false, Ordering::SeqCst);
      return Err(QueueError::Spawn(err));
    }
    inner.head = Some(head);
    inner.state = State::Running;
    log::debug!("Receiver queue started");
    Ok(())
  }

  /// Stop listening and release every queued batch. Never fails; idempotent.
  pub fn stop(&self) {
    let mut inner = self.inner.lock();
    self.stop_locked(&mut inner);
  }

  fn stop_locked(&self, inner: &mut Inner<S>) {
    if inner.state == State::Stopped && inner.head.is_none() {
      return;
    }
    self.carry_on.store(false, Ordering::SeqCst);
    // Long enough for a listener blocked in poll to observe the cleared flag
    // on its next timeout boundary.
    thread::sleep(self.shutdown_poll_period * 2);
    release_chain(inner.head.take());
    inner.state = State::Stopped;
    log::debug!("Receiver queue stopped");
  }

  /// Consume every ready batch with `timestamp <= deadline`, invoking the
  /// visitor for each event in source order.
  ///
  /// Non-blocking: processing ends at the first slot that is still waiting.
  /// A ready batch beyond the deadline goes back as the new head instead of
  /// being lost. A fatal listener error surfaces here once, and the queue
  /// transitions to `Stopped`.
  pub fn drain_until<F>(
    &self,
    deadline: TimestampNanos,
    mut visitor: F,
  ) -> Result<(), QueueError<S::Error>>
  where
    F: FnMut(&S::Event, TimestampNanos),
  {
    let mut inner = self.inner.lock();
    while let Some(slot) = inner.head.take() {
      match slot.try_take() {
        None => {
          // Still waiting for the listener: put the head back untouched.
          inner.head = Some(slot);
          break;
        }
        Some(SlotState::Ready(node)) => {
          if node.batch.timestamp > deadline {
            // Retrieved prematurely: repack the node into a fresh,
            // already-satisfied slot and reinstall it as the head.
            inner.head = Some(SlotHandle::ready(node));
            break;
          }
          let Node { batch, next, _live } = *node;
          for event in &batch.events {
            visitor(event, batch.timestamp);
          }
          inner.head = Some(next);
        }
        Some(SlotState::Waiting) => unreachable!("try_take never yields Waiting"),
        Some(SlotState::Interrupted) => break,
        Some(SlotState::Failed(err)) => {
          // The failed listener spawned no successor; the chain ends here.
          self.carry_on.store(false, Ordering::SeqCst);
          inner.state = State::Stopped;
          return Err(QueueError::Source(err));
        }
      }
    }
    Ok(())
  }

  pub fn state(&self) -> State {
    self.inner.lock().state
  }

  /// True iff the oldest slot already holds a batch.
  pub fn has_result(&self) -> bool {
    let inner = self.inner.lock();
    inner.head.as_ref().map_or(false, SlotHandle::is_ready)
  }

  /// Number of unconsumed batches currently alive (diagnostic).
  pub fn pending_batches(&self) -> usize {
    self.live_batches.load(Ordering::SeqCst)
  }

  fn listener_context(&self) -> ListenerContext<C> {
    ListenerContext {
      clock: self.clock.clone(),
      carry_on: self.carry_on.clone(),
      live_batches: self.live_batches.clone(),
      poll_period: self.shutdown_poll_period,
    }
  }
}

impl<S: EventSource, C: Clock> Drop for ReceiverQueue<S, C> {
  fn drop(&mut self) {
    let mut inner = self.inner.lock();
    self.stop_locked(&mut inner);
  }
}

/// Drop the chain iteratively. A recursive drop through node -> slot -> node
/// could exhaust the stack on a long backlog.
fn release_chain<S: EventSource>(head: Option<SlotHandle<S>>) {
  let mut cursor = head;
  while let Some(slot) = cursor {
    cursor = match slot.try_take() {
      Some(SlotState::Ready(node)) => {
        let Node { next, .. } = *node;
        Some(next)
      }
      _ => None,
    };
  }
}

fn spawn_listener<S: EventSource, C: Clock>(
  source: S,
  slot: SlotHandle<S>,
  ctx: ListenerContext<C>,
) -> std::io::Result<()> {
  thread::Builder::new()
    .name("segno-listener".into())
    .spawn(move || listen(source, slot, ctx))
    .map(|_| ())
}

/// One listener generation: wait for events, then hand the source to the
/// successor and fulfill the own slot.
///
/// The successor is spawned *before* the slot is fulfilled, so the node is
/// born with a live next handle and a consumer can never observe a torn
/// chain. At steady state exactly one listener, the tail, is blocked in poll.
fn listen<S: EventSource, C: Clock>(mut source: S, slot: SlotHandle<S>, ctx: ListenerContext<C>) {
  while ctx.carry_on.load(Ordering::SeqCst) {
    match source.wait_readable(ctx.poll_period) {
      Ok(true) if ctx.carry_on.load(Ordering::SeqCst) => {
        let events = match source.drain() {
          Ok(events) => events,
          Err(err) => {
            log::error!("Event source failed: {err}");
            slot.fail(err);
            return;
          }
        };
        if events.is_empty() {
          continue;
        }
        // The timestamp marks the instant the events left the source FIFO,
        // so it is taken after the drain, not after the poll.
        let timestamp = ctx.clock.now();
        let next = SlotHandle::waiting();
        let node = Box::new(Node {
          batch: EventBatch { timestamp, events },
          next: next.clone(),
          _live: LiveGuard::new(&ctx.live_batches),
        });
        if let Err(err) = spawn_listener(source, next.clone(), ctx.clone()) {
          log::error!("Failed to spawn the next listener: {err}");
          next.interrupt();
        }
        slot.fulfill(node);
        return;
      }
      Ok(_) => {} // timeout, or readable raced with shutdown: re-check the flag
      Err(err) => {
        log::error!("Event source failed while polling: {err}");
        slot.fail(err);
        return;
      }
    }
  }
  slot.interrupt();
}
