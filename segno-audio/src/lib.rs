pub(crate) mod config;
pub(crate) mod jack_driver;

pub use config::AudioConfig;
pub use jack_driver::{AudioDriver, AudioError, JackTiming, Result};
