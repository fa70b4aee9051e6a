//! Error types for `trawl-core`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// A post reached the reconciler without a usable hash or topic. Fatal to
  /// that post only; the rest of the batch is still processed.
  #[error("invalid post: {reason}")]
  InvalidPost { reason: String },
}

impl Error {
  pub(crate) fn invalid_post(reason: impl Into<String>) -> Self {
    Self::InvalidPost { reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
