#[cfg(target_os = "linux")]
mod alsa;

#[cfg(target_os = "linux")]
pub use crate::source::alsa::{AlsaError, AlsaSource};

use std::time::Duration;

use enum_dispatch::enum_dispatch;
use thiserror::Error;

use segno_engine::EventSource;

use crate::config::MidiConfig;
use crate::endpoints::SenderInfo;
use crate::event::MidiData;

#[derive(Error, Debug)]
pub enum Error {
  #[cfg(target_os = "linux")]
  #[error("Alsa: {0}")]
  Alsa(#[from] AlsaError),
}

#[enum_dispatch(Source)]
pub trait SourceSpec {
  /// The client name the sequencer actually assigned.
  fn client_name(&self) -> String;

  /// The receiver port name as the sequencer reports it.
  fn port_name(&self) -> String;

  /// Readable sender ports currently present on the system.
  fn senders(&self) -> Vec<SenderInfo>;

  /// Subscribe the receiver port to every sender matching `pattern`.
  /// Returns how many senders were connected.
  fn connect_senders(&self, pattern: &str) -> Result<usize, Error>;
}

#[enum_dispatch]
pub enum Source {
  #[cfg(target_os = "linux")]
  AlsaSource,
}

/// Open the platform sequencer client described by `config`, subscribing to
/// the configured senders.
#[cfg(target_os = "linux")]
pub fn create(config: &MidiConfig) -> Result<Source, Error> {
  let source: Source = AlsaSource::open(config)?.into();
  if let Some(pattern) = config.connect.as_deref() {
    let connected = source.connect_senders(pattern)?;
    log::info!("Connected {connected} sender(s) matching {pattern:?}");
  }
  Ok(source)
}

impl EventSource for Source {
  type Event = MidiData;
  type Error = Error;

  fn wait_readable(&mut self, timeout: Duration) -> Result<bool, Self::Error> {
    match self {
      #[cfg(target_os = "linux")]
      Source::AlsaSource(source) => source.wait_readable(timeout).map_err(Error::Alsa),
    }
  }

  fn drain(&mut self) -> Result<Vec<Self::Event>, Self::Error> {
    match self {
      #[cfg(target_os = "linux")]
      Source::AlsaSource(source) => source.drain().map_err(Error::Alsa),
    }
  }
}
