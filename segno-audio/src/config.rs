#[derive(Debug, Clone)]
pub struct AudioConfig {
  /// Desired client name; the server may uniquify it.
  pub client_name: String,
  /// Do not autostart a JACK server when none is running.
  pub no_start_server: bool,
}

impl AudioConfig {
  pub const DEFAULT_CLIENT_NAME: &'static str = "segno";
}

impl Default for AudioConfig {
  fn default() -> Self {
    Self {
      client_name: AudioConfig::DEFAULT_CLIENT_NAME.to_string(),
      no_start_server: true,
    }
  }
}
