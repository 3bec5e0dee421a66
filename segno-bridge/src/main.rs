mod bridge;
mod config;
mod errors;
mod logging;
mod processor;

use clap::Parser;

use segno_midi::{MidiConfig, SourceSpec};

use crate::bridge::Bridge;
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Client name announced to both the sequencer and the JACK server
  #[arg(long, default_value = MidiConfig::DEFAULT_CLIENT_NAME)]
  name: String,

  /// Subscribe to sender ports matching a `client:port` address or a name
  /// fragment
  #[arg(long)]
  connect: Option<String>,

  /// List the available sender ports and exit
  #[arg(long)]
  list_senders: bool,

  /// Log at debug level
  #[arg(short, long)]
  verbose: bool,
}

fn main() {
  let args = Args::parse();
  logging::init(args.verbose).ok();

  if let Err(err) = run(args) {
    log::error!("{err}");
    std::process::exit(1);
  }
}

fn run(args: Args) -> errors::Result<()> {
  let mut config = Config::default();
  config.midi.client_name = args.name.clone();
  config.midi.connect = args.connect;
  config.audio.client_name = args.name;

  if args.list_senders {
    let probe = MidiConfig {
      connect: None,
      ..config.midi
    };
    let source = segno_midi::source::create(&probe)?;
    println!("Senders:");
    for sender in source.senders() {
      println!(
        "  [{:>3}:{:<2}] {} - {}",
        sender.client, sender.port, sender.client_name, sender.port_name
      );
    }
    return Ok(());
  }

  let bridge = Bridge::open(config)?;
  println!(
    "Bridging to JACK client {:?} === Press Enter to stop ===",
    bridge.driver().name()
  );

  let mut line = String::new();
  std::io::stdin().read_line(&mut line).ok();

  bridge.close()
}
