use thiserror::Error;

use segno_engine::{CycleTimes, CycleTimesError, CycleTiming};

use crate::config::AudioConfig;

#[derive(Error, Debug)]
pub enum AudioError {
  #[error("Error opening the JACK client: {0}")]
  ClientOpen(jack::Error),

  #[error("Error registering a port: {0}")]
  PortRegister(jack::Error),

  #[error("Error activating the JACK client: {0}")]
  Activate(jack::Error),

  #[error("Error deactivating the JACK client: {0}")]
  Deactivate(jack::Error),
}

pub type Result<T> = core::result::Result<T, AudioError>;

/// An activated JACK client driving a user-supplied process handler.
///
/// Server chatter goes through the `log` facade (rust-jack wires the JACK
/// error and info callbacks into `log` by default) instead of stderr.
pub struct AudioDriver<H: jack::ProcessHandler + 'static> {
  active: jack::AsyncClient<(), H>,
  name: String,
  sample_rate: u32,
  buffer_size: u32,
}

impl<H: jack::ProcessHandler + 'static> AudioDriver<H> {
  /// Open the client, let `build_handler` register ports against it, then
  /// activate. The process callback starts running before this returns.
  pub fn new<F>(config: &AudioConfig, build_handler: F) -> Result<Self>
  where
    F: FnOnce(&jack::Client) -> Result<H>,
  {
    let options = if config.no_start_server {
      jack::ClientOptions::NO_START_SERVER
    } else {
      jack::ClientOptions::empty()
    };
    let (client, status) =
      jack::Client::new(&config.client_name, options).map_err(AudioError::ClientOpen)?;
    log::debug!("JACK client opened with status {status:?}");

    let name = client.name().to_string();
    let sample_rate = client.sample_rate() as u32;
    let buffer_size = client.buffer_size();

    let handler = build_handler(&client)?;
    let active = client
      .activate_async((), handler)
      .map_err(AudioError::Activate)?;
    log::info!("JACK client {name:?} active: {sample_rate} Hz, {buffer_size} frames per cycle");

    Ok(Self {
      active,
      name,
      sample_rate,
      buffer_size,
    })
  }

  pub fn client(&self) -> &jack::Client {
    self.active.as_client()
  }

  /// The name the server actually assigned.
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn sample_rate(&self) -> u32 {
    self.sample_rate
  }

  pub fn buffer_size(&self) -> u32 {
    self.buffer_size
  }

  /// Remove the client from the process graph. The process callback is not
  /// invoked again after this returns.
  pub fn deactivate(self) -> Result<()> {
    self
      .active
      .deactivate()
      .map(|_| ())
      .map_err(AudioError::Deactivate)
  }
}

/// Cycle-timing queries answered by JACK, valid for one process callback.
pub struct JackTiming<'a> {
  client: &'a jack::Client,
  scope: &'a jack::ProcessScope,
}

impl<'a> JackTiming<'a> {
  pub fn new(client: &'a jack::Client, scope: &'a jack::ProcessScope) -> Self {
    Self { client, scope }
  }
}

impl CycleTiming for JackTiming<'_> {
  fn cycle_times(&self) -> core::result::Result<CycleTimes, CycleTimesError> {
    match self.scope.cycle_times() {
      Ok(times) => Ok(CycleTimes {
        frames_since_cycle_start: self.client.frames_since_cycle_start(),
        period_usecs: times.period_usecs,
      }),
      Err(err) => {
        log::warn!("JACK cycle times unavailable: {err}");
        Err(CycleTimesError)
      }
    }
  }
}
