//! Error type for `dbbe-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("failed to prepare table {table}: {source}")]
  Schema {
    table:  String,
    #[source]
    source: rusqlite::Error,
  },

  /// A write named a table the schema does not declare.
  #[error("table {0} is not part of the output schema")]
  UnknownTable(String),

  #[error("failed to create output directory {path}: {source}")]
  Io {
    path:   String,
    #[source]
    source: std::io::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
