use segno_audio::AudioConfig;
use segno_engine::QueueConfig;
use segno_midi::MidiConfig;

#[derive(Debug, Clone, Default)]
pub struct Config {
  pub midi: MidiConfig,
  pub audio: AudioConfig,
  pub queue: QueueConfig,
}
