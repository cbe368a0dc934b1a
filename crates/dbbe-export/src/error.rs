//! Error types for `dbbe-export`.

use thiserror::Error;

use crate::step::Step;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] dbbe_core::Error),

  #[error("output store error: {0}")]
  Store(#[from] dbbe_store_sqlite::Error),

  /// A document store or relational source failure.
  #[error("source error: {0}")]
  Source(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("archival error: {0}")]
  Archive(#[from] dbbe_zenodo::Error),

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("zenodo.token is not configured")]
  MissingToken,

  #[error("no snapshot files found in {0}")]
  NoSnapshot(String),

  #[error("cannot list {path}: {source}")]
  Io {
    path:   String,
    #[source]
    source: std::io::Error,
  },

  #[error("step {step} failed: {source}")]
  StepFailed {
    step:   Step,
    #[source]
    source: Box<Error>,
  },
}

impl Error {
  pub fn upstream<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    Self::Source(Box::new(err))
  }

  /// The step a failure happened in, if it happened inside the pipeline.
  pub fn step(&self) -> Option<Step> {
    match self {
      Self::StepFailed { step, .. } => Some(*step),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
