use thiserror::Error;


/// Errors reported by nets, layers and snapshots.

#[derive(Debug, Error)]
pub enum Error {
  #[error("{operation} requires an optimizer to be attached first")]
  NotReady { operation: &'static str },

  #[error("Loss is not tracked on any tape, so nothing can be learned from it")]
  DetachedLoss,

  #[error("Snapshot holds {found} parameter tensors but the net has {expected}")]
  SnapshotMismatch { expected: usize, found: usize },

  #[error("Snapshot could not be encoded: {0}")]
  Snapshot(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl From<postcard::Error> for Error {
  fn from(err: postcard::Error) -> Self {
    Self::Snapshot(err.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
