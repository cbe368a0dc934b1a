//! Reconciled records handed to the output store.
//!
//! A record is the merge of one search-index document with whatever the
//! relational source adds for it. Lookup references stay as [`NamedRef`]s;
//! the store resolves them.

use serde::{Deserialize, Serialize};

use crate::{
  biblio::BiblioType,
  document::{NamedRef, RoleRef},
  entity::EntityKind,
  fuzzy_date::FuzzyDate,
  hierarchy::HierarchyNode,
};

/// A hierarchy chain, root first. The last node is the attachment point.
pub type Chain = Vec<HierarchyNode>;

/// A typed external identifier such as a VIAF or Diktyon number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identification {
  pub kind:  String,
  pub value: String,
}

impl Identification {
  pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      kind:  kind.into(),
      value: value.into(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerseRecord {
  pub id:             i64,
  pub text:           Option<String>,
  pub order:          Option<i64>,
  pub occurrence_id:  Option<i64>,
  pub manuscript_id:  Option<i64>,
  pub verse_group_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonRecord {
  pub id:                i64,
  pub first_name:        Option<String>,
  pub last_name:         Option<String>,
  pub full_name:         Option<String>,
  pub born:              FuzzyDate,
  pub died:              FuzzyDate,
  pub is_historical:     bool,
  pub is_modern:         bool,
  pub is_dbbe:           bool,
  pub created:           Option<String>,
  pub modified:          Option<String>,
  pub public_comment:    Option<String>,
  pub private_comment:   Option<String>,
  pub origination:       Chain,
  pub management:        Vec<NamedRef>,
  pub acknowledgements:  Vec<NamedRef>,
  pub self_designations: Vec<NamedRef>,
  pub offices:           Vec<NamedRef>,
  pub identifications:   Vec<Identification>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryRecord {
  pub id:     i64,
  pub name:   Option<String>,
  pub region: Chain,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManuscriptRecord {
  pub id:                    i64,
  pub name:                  Option<String>,
  pub shelf:                 Option<String>,
  pub completion_floor:      Option<i64>,
  pub completion_ceiling:    Option<i64>,
  pub created:               Option<String>,
  pub modified:              Option<String>,
  pub number_of_occurrences: Option<i64>,
  pub library:               Option<LibraryRecord>,
  pub collection:            Option<NamedRef>,
  /// One chain per leaf content node.
  pub content:               Vec<Chain>,
  pub written_at:            Vec<Chain>,
  pub roles:                 Vec<RoleRef>,
  pub management:            Vec<NamedRef>,
  pub acknowledgements:      Vec<NamedRef>,
  pub identifications:       Vec<Identification>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccurrenceRecord {
  pub id:                   i64,
  pub manuscript_id:        Option<i64>,
  pub created:              Option<String>,
  pub modified:             Option<String>,
  pub public_comment:       Option<String>,
  pub private_comment:      Option<String>,
  pub is_dbbe:              Option<bool>,
  pub incipit:              Option<String>,
  pub text_stemmer:         Option<String>,
  pub text_original:        Option<String>,
  pub location:             Option<String>,
  pub date_floor_year:      Option<String>,
  pub date_ceiling_year:    Option<String>,
  pub palaeographical_info: Option<String>,
  pub contextual_info:      Option<String>,
  pub title:                Option<String>,
  pub genres:               Vec<NamedRef>,
  pub metres:               Vec<NamedRef>,
  pub keywords:             Vec<NamedRef>,
  pub management:           Vec<NamedRef>,
  pub acknowledgements:     Vec<NamedRef>,
  pub text_status:          Option<NamedRef>,
  pub roles:                Vec<RoleRef>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeRecord {
  pub id:               i64,
  pub text_stemmer:     Option<String>,
  pub text_original:    Option<String>,
  pub lemma:            Option<String>,
  pub incipit:          Option<String>,
  pub created:          Option<String>,
  pub modified:         Option<String>,
  pub public_comment:   Option<String>,
  pub private_comment:  Option<String>,
  pub title:            Option<String>,
  pub number_of_verses: Option<i64>,
  pub genres:           Vec<NamedRef>,
  pub metres:           Vec<NamedRef>,
  pub tags:             Vec<NamedRef>,
  pub keywords:         Vec<NamedRef>,
  pub management:       Vec<NamedRef>,
  pub acknowledgements: Vec<NamedRef>,
  pub editorial_status: Option<NamedRef>,
  pub text_status:      Option<NamedRef>,
  pub occurrence_ids:   Vec<i64>,
  pub roles:            Vec<RoleRef>,
}

/// An undirected edge between two rows of the same table, stored with the
/// lower id first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
  pub low:           i64,
  pub high:          i64,
  pub definition_id: i64,
  pub definition:    String,
}

impl Relation {
  /// Canonicalises the pair; self-edges yield `None`.
  pub fn undirected(
    a: i64,
    b: i64,
    definition_id: i64,
    definition: impl Into<String>,
  ) -> Option<Self> {
    if a == b {
      return None;
    }
    Some(Self {
      low: a.min(b),
      high: a.max(b),
      definition_id,
      definition: definition.into(),
    })
  }
}

/// Subtype-specific bibliography columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BiblioDetails {
  #[default]
  None,
  BlogPost {
    url:       Option<String>,
    post_date: Option<String>,
  },
  OnlineSource {
    url:           Option<String>,
    last_accessed: Option<String>,
  },
  Phd {
    city:        Option<String>,
    year:        Option<i64>,
    institution: Option<String>,
    volume:      Option<String>,
    forthcoming: Option<bool>,
  },
  BibVaria {
    city:        Option<String>,
    year:        Option<i64>,
    institution: Option<String>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BiblioRecord {
  pub id:              i64,
  pub biblio_type:     BiblioType,
  pub title:           Option<String>,
  pub title_sort_key:  Option<String>,
  pub created:         Option<String>,
  pub modified:        Option<String>,
  pub public_comment:  Option<String>,
  pub private_comment: Option<String>,
  pub details:         BiblioDetails,
}

/// A bibliography reference resolved to concrete tables on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceLink {
  pub entity:        EntityKind,
  pub entity_id:     i64,
  pub biblio_type:   BiblioType,
  pub biblio_id:     i64,
  pub page_start:    Option<i64>,
  pub page_end:      Option<i64>,
  /// The page range as given, when it is not a pair of numbers.
  pub raw_pages:     Option<String>,
  pub url:           Option<String>,
  pub source_remark: Option<String>,
  pub image:         Option<String>,
}

impl ReferenceLink {
  /// Splits a source page range into numeric bounds, falling back to the raw
  /// text when either bound is not a number.
  pub fn pages(
    start: Option<&str>,
    end: Option<&str>,
  ) -> (Option<i64>, Option<i64>, Option<String>) {
    let start = start.map(str::trim).filter(|s| !s.is_empty());
    let end = end.map(str::trim).filter(|s| !s.is_empty());
    let parse = |s: Option<&str>| s.map(|s| s.parse::<i64>());

    match (parse(start), parse(end)) {
      (Some(Err(_)), _) | (_, Some(Err(_))) => {
        let raw = match (start, end) {
          (Some(s), Some(e)) => format!("{s}-{e}"),
          (Some(s), None) => s.to_owned(),
          (None, Some(e)) => e.to_owned(),
          (None, None) => String::new(),
        };
        (None, None, Some(raw))
      }
      (s, e) => (s.and_then(Result::ok), e.and_then(Result::ok), None),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalIssueRecord {
  pub id:         i64,
  pub journal_id: i64,
  pub title:      Option<String>,
}

impl JournalIssueRecord {
  /// Joins the non-empty issue parts into a display title.
  pub fn compose_title(
    year: Option<&str>,
    series: Option<&str>,
    volume: Option<&str>,
    number: Option<&str>,
    forthcoming: bool,
  ) -> Option<String> {
    let mut parts: Vec<&str> = [year, series, volume, number]
      .into_iter()
      .flatten()
      .map(str::trim)
      .filter(|p| !p.is_empty())
      .collect();
    if forthcoming {
      parts.push("(forthcoming)");
    }
    (!parts.is_empty()).then(|| parts.join(" "))
  }
}

/// Points a bibliography entry at the document containing it (an article's
/// journal issue, a chapter's book, a post's blog).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLink {
  pub biblio_type:  BiblioType,
  pub content_id:   i64,
  pub container_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiblioRoleLink {
  pub biblio_type: BiblioType,
  pub biblio_id:   i64,
  pub person_id:   i64,
  pub role:        String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiblioManagementLink {
  pub biblio_type: BiblioType,
  pub biblio_id:   i64,
  pub management:  NamedRef,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn relations_are_canonical() {
    let r = Relation::undirected(9, 4, 0, "verse_related").unwrap();
    assert_eq!((r.low, r.high), (4, 9));
    assert_eq!(Relation::undirected(4, 9, 0, "verse_related"), Some(r));
    assert!(Relation::undirected(5, 5, 0, "verse_related").is_none());
  }

  #[test]
  fn issue_titles_skip_missing_parts() {
    assert_eq!(
      JournalIssueRecord::compose_title(Some("1999"), None, Some("12"), Some(" "), true),
      Some("1999 12 (forthcoming)".into())
    );
    assert_eq!(JournalIssueRecord::compose_title(None, None, None, None, false), None);
  }

  #[test]
  fn numeric_pages_are_split_and_others_kept_raw() {
    assert_eq!(ReferenceLink::pages(Some("12"), Some(" 15")), (Some(12), Some(15), None));
    assert_eq!(ReferenceLink::pages(Some("12"), None), (Some(12), None, None));
    assert_eq!(
      ReferenceLink::pages(Some("xii"), Some("xv")),
      (None, None, Some("xii-xv".into()))
    );
    assert_eq!(ReferenceLink::pages(None, Some("")), (None, None, None));
  }
}
