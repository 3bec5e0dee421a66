use thiserror::Error;

use segno_audio::AudioError;
use segno_engine::QueueError;
use segno_midi::source;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Midi: {0}")]
  Midi(#[from] source::Error),

  #[error("Audio: {0}")]
  Audio(#[from] AudioError),

  #[error("Queue: {0}")]
  Queue(#[from] QueueError<source::Error>),
}

pub type Result<T> = core::result::Result<T, Error>;
