use std::sync::Arc;

use segno_audio::{AudioDriver, AudioError};
use segno_engine::{CycleDispatcher, MonotonicClock, ReceiverQueue};
use segno_midi::source::{self, Source};
use segno_midi::SourceSpec;

use crate::config::Config;
use crate::errors::Result;
use crate::processor::Processor;

/// The assembled bridge: sequencer source feeding the receiver queue,
/// drained by the JACK process callback.
pub struct Bridge {
  queue: Arc<ReceiverQueue<Source, MonotonicClock>>,
  driver: AudioDriver<Processor>,
}

impl Bridge {
  pub fn open(config: Config) -> Result<Self> {
    let clock = Arc::new(MonotonicClock::new());
    let queue = Arc::new(ReceiverQueue::with_config(
      clock.clone(),
      config.queue.clone(),
    ));

    let source = source::create(&config.midi)?;
    log::info!(
      "Sequencer client {:?}, receiver port {:?}",
      source.client_name(),
      source.port_name()
    );

    let driver = AudioDriver::new(&config.audio, |client| {
      let midi_out = client
        .register_port("out", jack::MidiOut::default())
        .map_err(AudioError::PortRegister)?;
      let mut dispatcher = CycleDispatcher::new(clock.clone(), client.sample_rate() as u32);
      dispatcher.invalidate_timing();
      Ok(Processor::new(queue.clone(), dispatcher, midi_out))
    })?;

    queue.start(source)?;

    Ok(Self { queue, driver })
  }

  pub fn driver(&self) -> &AudioDriver<Processor> {
    &self.driver
  }

  /// Stop the listener, then detach from the JACK graph. After this returns
  /// neither the sink nor the process callback runs again.
  pub fn close(self) -> Result<()> {
    self.queue.stop();
    self.driver.deactivate()?;
    Ok(())
  }
}
