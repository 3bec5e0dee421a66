use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

pub fn init(verbose: bool) -> Result<(), SetLoggerError> {
  let level = if verbose {
    LevelFilter::Debug
  } else {
    LevelFilter::Info
  };
  TermLogger::init(
    level,
    Config::default(),
    TerminalMode::Stderr,
    ColorChoice::Auto,
  )
}
