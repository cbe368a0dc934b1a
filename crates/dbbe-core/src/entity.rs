//! Entity kinds that bibliography references can point at.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A referencable entity table in the output store.
///
/// The declaration order doubles as the resolution priority when an id shows
/// up in more than one candidate table of the relational source.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
  Manuscript,
  Occurrence,
  Type,
  Person,
}

impl EntityKind {
  /// Output table holding rows of this kind.
  pub fn table(self) -> &'static str { self.into() }

  /// Column name used for this kind in join tables.
  pub fn id_column(self) -> &'static str {
    match self {
      Self::Manuscript => "manuscript_id",
      Self::Occurrence => "occurrence_id",
      Self::Type => "type_id",
      Self::Person => "person_id",
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn parses_source_labels() {
    assert_eq!(EntityKind::from_str("type").unwrap(), EntityKind::Type);
    assert_eq!(EntityKind::from_str("manuscript").unwrap().table(), "manuscript");
    assert!(EntityKind::from_str("translation").is_err());
  }

  #[test]
  fn priority_follows_declaration_order() {
    assert!(EntityKind::Manuscript < EntityKind::Person);
    assert!(EntityKind::Occurrence < EntityKind::Type);
  }
}
