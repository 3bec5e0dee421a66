use std::sync::Arc;

use segno_audio::JackTiming;
use segno_engine::{CycleDispatcher, MonotonicClock, ReceiverQueue};
use segno_midi::{MidiData, Source};

/// The realtime side of the bridge: on each JACK cycle, drain the receiver
/// queue up to the cycle deadline and write every event into the MIDI out
/// port at its frame offset.
pub struct Processor {
  queue: Arc<ReceiverQueue<Source, MonotonicClock>>,
  dispatcher: CycleDispatcher<MonotonicClock>,
  midi_out: jack::Port<jack::MidiOut>,
}

impl Processor {
  pub fn new(
    queue: Arc<ReceiverQueue<Source, MonotonicClock>>,
    dispatcher: CycleDispatcher<MonotonicClock>,
    midi_out: jack::Port<jack::MidiOut>,
  ) -> Self {
    Self {
      queue,
      dispatcher,
      midi_out,
    }
  }
}

impl jack::ProcessHandler for Processor {
  fn process(&mut self, client: &jack::Client, scope: &jack::ProcessScope) -> jack::Control {
    let timing = JackTiming::new(client, scope);
    let mut writer = self.midi_out.writer(scope);

    let result = self.dispatcher.run_cycle(
      &self.queue,
      &timing,
      scope.n_frames(),
      |event: &MidiData, offset| {
        let raw = jack::RawMidi {
          time: offset,
          bytes: event.bytes(),
        };
        if let Err(err) = writer.write(&raw) {
          // A full event buffer costs this event, not the whole client.
          log::warn!("Dropped a {} byte event: {err}", event.len());
        }
      },
    );

    match result {
      Ok(()) => jack::Control::Continue,
      Err(err) => {
        log::error!("Stopping the bridge: {err}");
        jack::Control::Quit
      }
    }
  }
}
