//! Error types for `dbbe-zenodo`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{method} {path} → {status}: {body}")]
  Status {
    method: &'static str,
    path:   String,
    status: u16,
    body:   String,
  },

  #[error("deposition {0} not found")]
  DepositionNotFound(u64),

  #[error("new version of deposition {0} did not report a usable draft link")]
  MissingDraftLink(u64),

  #[error("cannot read {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("no files to publish")]
  NoFiles,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
