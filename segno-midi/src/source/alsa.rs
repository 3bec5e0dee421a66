use std::ffi::CString;
use std::time::Duration;

use alsa::seq::{Addr, ClientIter, MidiEvent, PortCap, PortIter, PortSubscribe, PortType, Seq};
use alsa::{Direction, PollDescriptors};
use thiserror::Error;

use crate::config::MidiConfig;
use crate::endpoints::SenderInfo;
use crate::event::{MidiData, MAX_EVENT_SIZE};
use crate::source;
use crate::source::SourceSpec;

#[derive(Error, Debug)]
pub enum AlsaError {
  #[error("Error opening the sequencer client: {0}")]
  ClientOpen(alsa::Error),

  #[error("Error creating the receiver port: {0}")]
  PortCreate(alsa::Error),

  #[error("Name contains a NUL byte")]
  InvalidName,

  #[error("No sender port matches {0:?}")]
  NoMatchingSender(String),

  #[error("Error subscribing to a sender port: {0}")]
  Subscribe(alsa::Error),

  #[error("Error polling the sequencer: {0}")]
  Poll(alsa::Error),

  #[error("Error reading from the sequencer: {0}")]
  EventInput(alsa::Error),

  #[error("Error preparing the event decoder: {0}")]
  DecoderCreate(alsa::Error),

  #[error("Error decoding a sequencer event: {0}")]
  Decode(alsa::Error),
}

/// A non-blocking ALSA sequencer client with one writable receiver port.
pub struct AlsaSource {
  seq: Seq,
  client_id: i32,
  port: i32,
}

impl AlsaSource {
  pub fn open(config: &MidiConfig) -> Result<Self, AlsaError> {
    let seq = Seq::open(None, None, true).map_err(AlsaError::ClientOpen)?;

    let client_name =
      CString::new(config.client_name.as_str()).map_err(|_| AlsaError::InvalidName)?;
    seq.set_client_name(&client_name).map_err(AlsaError::ClientOpen)?;
    let client_id = seq.client_id().map_err(AlsaError::ClientOpen)?;

    let port_name = CString::new(config.port_name.as_str()).map_err(|_| AlsaError::InvalidName)?;
    let port = seq
      .create_simple_port(
        &port_name,
        PortCap::WRITE | PortCap::SUBS_WRITE,
        PortType::MIDI_GENERIC | PortType::APPLICATION,
      )
      .map_err(AlsaError::PortCreate)?;

    log::debug!("Sequencer client {client_id} opened, receiver port {port}");

    Ok(Self {
      seq,
      client_id,
      port,
    })
  }

  /// Block for at most `timeout` until the sequencer has readable input.
  pub fn wait_readable(&mut self, timeout: Duration) -> Result<bool, AlsaError> {
    let poll_source = (&self.seq, Some(Direction::Capture));
    let mut fds = vec![
      libc::pollfd {
        fd: 0,
        events: 0,
        revents: 0,
      };
      poll_source.count()
    ];
    poll_source.fill(&mut fds).map_err(AlsaError::Poll)?;
    let readable = alsa::poll::poll(&mut fds, timeout.as_millis() as i32).map_err(AlsaError::Poll)?;
    Ok(readable > 0)
  }

  /// Pull everything queued on the sequencer FIFO, in arrival order, decoded
  /// to raw MIDI bytes.
  pub fn drain(&mut self) -> Result<Vec<MidiData>, AlsaError> {
    let mut decoder = MidiEvent::new(MAX_EVENT_SIZE as u32).map_err(AlsaError::DecoderCreate)?;
    decoder.enable_running_status(false);

    let mut input = self.seq.input();
    let mut events = Vec::new();
    let mut buf = [0u8; MAX_EVENT_SIZE];
    loop {
      match input.event_input_pending(true) {
        Ok(0) => break,
        Ok(_) => {}
        Err(err) if err.errno() == libc::EAGAIN => break,
        Err(err) => return Err(AlsaError::EventInput(err)),
      }
      let mut event = match input.event_input() {
        Ok(event) => event,
        Err(err) if err.errno() == libc::EAGAIN => break,
        Err(err) => return Err(AlsaError::EventInput(err)),
      };
      match decoder.decode(&mut buf, &mut event) {
        Ok(0) => {}
        Ok(len) => events.push(MidiData::new(&buf[..len])),
        // Events without a byte-stream rendering (port management, queue
        // control) are not MIDI data.
        Err(err) if err.errno() == libc::ENOENT => {}
        Err(err) => return Err(AlsaError::Decode(err)),
      }
    }
    Ok(events)
  }
}

impl SourceSpec for AlsaSource {
  fn client_name(&self) -> String {
    self
      .seq
      .get_any_client_info(self.client_id)
      .and_then(|info| info.get_name().map(str::to_string))
      .unwrap_or_default()
  }

  fn port_name(&self) -> String {
    let addr = Addr {
      client: self.client_id,
      port: self.port,
    };
    self
      .seq
      .get_any_port_info(addr)
      .and_then(|info| info.get_name().map(str::to_string))
      .unwrap_or_default()
  }

  fn senders(&self) -> Vec<SenderInfo> {
    let mut senders = Vec::new();
    for client_info in ClientIter::new(&self.seq) {
      let client = client_info.get_client();
      if client == self.client_id {
        continue;
      }
      let client_name = client_info.get_name().unwrap_or_default().to_string();
      for port_info in PortIter::new(&self.seq, client) {
        let caps = port_info.get_capability();
        if caps.contains(PortCap::READ | PortCap::SUBS_READ) {
          senders.push(SenderInfo::new(
            client,
            port_info.get_port(),
            client_name.clone(),
            port_info.get_name().unwrap_or_default().to_string(),
          ));
        }
      }
    }
    senders
  }

  fn connect_senders(&self, pattern: &str) -> Result<usize, source::Error> {
    let mut connected = 0;
    for sender in self.senders() {
      if !sender.matches(pattern) {
        continue;
      }
      let subscription = PortSubscribe::empty().map_err(AlsaError::Subscribe)?;
      subscription.set_sender(Addr {
        client: sender.client,
        port: sender.port,
      });
      subscription.set_dest(Addr {
        client: self.client_id,
        port: self.port,
      });
      self
        .seq
        .subscribe_port(&subscription)
        .map_err(AlsaError::Subscribe)?;
      log::info!(
        "Subscribed to {} - {} ({}:{})",
        sender.client_name,
        sender.port_name,
        sender.client,
        sender.port
      );
      connected += 1;
    }
    if connected == 0 {
      return Err(AlsaError::NoMatchingSender(pattern.to_string()).into());
    }
    Ok(connected)
  }
}
