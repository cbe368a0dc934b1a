//! The closed family of bibliography subtypes.
//!
//! Every subtype is materialised as its own table together with a person-role
//! join table, a management join table and one reference join table per
//! [`EntityKind`]. All of those names are derived here so the schema
//! generator and the writers can never disagree.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};

use crate::entity::EntityKind;

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
pub enum BiblioType {
  Article,
  BlogPost,
  Book,
  BookChapter,
  OnlineSource,
  Phd,
  BibVaria,
}

impl BiblioType {
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }

  pub fn table(self) -> &'static str { self.into() }

  /// Column naming this subtype in its reference join tables.
  pub fn id_column(self) -> String { format!("{}_id", self.table()) }

  pub fn person_role_table(self) -> String {
    format!("{}_person_role", self.table())
  }

  pub fn management_table(self) -> String {
    format!("{}_management", self.table())
  }

  /// Join table for references from this subtype to `entity`, named
  /// `{entity}_{subtype}`.
  pub fn reference_table(self, entity: EntityKind) -> String {
    format!("{}_{}", entity.table(), self.table())
  }

  /// Subtype-specific columns filled from the relational source on insert.
  pub fn detail_columns(self) -> &'static [(&'static str, &'static str)] {
    match self {
      Self::BlogPost => &[("url", "TEXT"), ("post_date", "TEXT")],
      Self::OnlineSource => &[("url", "TEXT"), ("last_accessed", "TEXT")],
      Self::Phd => &[
        ("city", "TEXT"),
        ("year", "INTEGER"),
        ("institution", "TEXT"),
        ("volume", "TEXT"),
        ("forthcoming", "BOOLEAN"),
      ],
      Self::BibVaria => &[
        ("city", "TEXT"),
        ("year", "INTEGER"),
        ("institution", "TEXT"),
      ],
      Self::Article | Self::Book | Self::BookChapter => &[],
    }
  }

  /// Column pointing at the document that contains this one, if the subtype
  /// has a container.
  pub fn container_column(self) -> Option<&'static str> {
    match self {
      Self::Article => Some("journal_issue_id"),
      Self::BlogPost => Some("blog_id"),
      Self::BookChapter => Some("book_id"),
      _ => None,
    }
  }
}
