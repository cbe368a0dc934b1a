//! Error types for `dbbe-core`.

use thiserror::Error;

use crate::hierarchy::HierarchyKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid fuzzy date: {0:?}")]
  FuzzyDate(String),

  #[error("{hierarchy} hierarchy has a cycle through node {node}")]
  HierarchyCycle { hierarchy: HierarchyKind, node: i64 },

  #[error("{hierarchy} hierarchy below node {leaf} is deeper than {max} levels")]
  HierarchyTooDeep {
    hierarchy: HierarchyKind,
    leaf:      i64,
    max:       usize,
  },

  /// The loader relies on at most one origination fact per person.
  #[error("person {0} has more than one origination fact")]
  MultipleOriginations(i64),

  #[error("unknown bibliography type: {0:?}")]
  UnknownBiblioType(String),

  #[error("unknown entity kind: {0:?}")]
  UnknownEntityKind(String),

  #[error("document {id} is malformed: {source}")]
  Document {
    id:     String,
    #[source]
    source: serde_json::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
