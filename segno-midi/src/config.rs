#[derive(Debug, Clone)]
pub struct MidiConfig {
  /// Client name announced to the sequencer.
  pub client_name: String,
  /// Name of the writable receiver port.
  pub port_name: String,
  /// Sender ports to subscribe to at startup, by `client:port` address or
  /// by a name fragment.
  pub connect: Option<String>,
}

impl MidiConfig {
  pub const DEFAULT_CLIENT_NAME: &'static str = "segno";
  pub const DEFAULT_PORT_NAME: &'static str = "in";
}

impl Default for MidiConfig {
  fn default() -> Self {
    Self {
      client_name: MidiConfig::DEFAULT_CLIENT_NAME.to_string(),
      port_name: MidiConfig::DEFAULT_PORT_NAME.to_string(),
      connect: None,
    }
  }
}
