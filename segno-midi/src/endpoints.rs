pub type ClientId = i32;
pub type PortId = i32;

/// A readable sender port present on the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderInfo {
  pub client: ClientId,
  pub port: PortId,
  pub client_name: String,
  pub port_name: String,
}

impl SenderInfo {
  pub fn new(client: ClientId, port: PortId, client_name: String, port_name: String) -> Self {
    Self {
      client,
      port,
      client_name,
      port_name,
    }
  }

  /// `pattern` is either an exact `client:port` address or a fragment of
  /// the client or port name.
  pub fn matches(&self, pattern: &str) -> bool {
    if let Some((client, port)) = parse_addr(pattern) {
      return self.client == client && self.port == port;
    }
    self.client_name.contains(pattern) || self.port_name.contains(pattern)
  }
}

fn parse_addr(pattern: &str) -> Option<(ClientId, PortId)> {
  let (client, port) = pattern.split_once(':')?;
  Some((client.trim().parse().ok()?, port.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn through_port() -> SenderInfo {
    SenderInfo::new(
      14,
      0,
      "Midi Through".to_string(),
      "Midi Through Port-0".to_string(),
    )
  }

  #[test]
  fn matches_by_exact_address() {
    let sender = through_port();
    assert!(sender.matches("14:0"));
    assert!(sender.matches(" 14 : 0 "));
    assert!(!sender.matches("14:1"));
    assert!(!sender.matches("15:0"));
  }

  #[test]
  fn matches_by_name_fragment() {
    let sender = through_port();
    assert!(sender.matches("Through"));
    assert!(sender.matches("Port-0"));
    assert!(!sender.matches("Virtual"));
  }

  #[test]
  fn a_malformed_address_falls_back_to_name_matching() {
    let sender = through_port();
    assert!(!sender.matches("a:b"));
    assert!(!sender.matches("14:"));
  }
}
