//! Error types for `dbbe-source`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("postgres error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{method} {path} → {status}: {body}")]
  Status {
    method: &'static str,
    path:   String,
    status: u16,
    body:   String,
  },

  #[error(transparent)]
  Core(#[from] dbbe_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
