//! The two read-only sources the export reconciles.
//!
//! [`DocumentStore`] is the denormalised search projection, read in full per
//! collection. [`RelationalSource`] is the normalised source of truth, asked
//! only for the facts the projection lacks. Implementations live in
//! `dbbe-source`; tests use in-memory fakes.

use std::{collections::HashMap, future::Future};

use serde_json::Value;
use strum::{Display, IntoStaticStr};

use crate::{
  biblio::BiblioType,
  document::Document,
  entity::EntityKind,
  hierarchy::{HierarchyKind, HierarchyNode},
  record::BiblioDetails,
};

// ─── Document store ──────────────────────────────────────────────────────────

/// Collections held by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
  Verses,
  Persons,
  Manuscripts,
  Occurrences,
  Types,
  Bibliographies,
}

pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Reads every document of a collection, `page_size` documents per round
  /// trip. The read always starts from the beginning.
  fn scroll_all(
    &self,
    collection: Collection,
    page_size: usize,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  /// Fetches documents by id. Ids that are not found map to `None`. Callers
  /// are responsible for chunking.
  fn multi_get<'a>(
    &'a self,
    collection: Collection,
    ids: &'a [String],
  ) -> impl Future<Output = Result<HashMap<String, Option<Value>>, Self::Error>> + Send + 'a;
}

// ─── Relational rows ─────────────────────────────────────────────────────────

/// One person row per name, birth, death and origination fact combination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonRow {
  pub id:                 i64,
  pub first_name:         Option<String>,
  pub last_name:          Option<String>,
  pub born:               Option<String>,
  pub died:               Option<String>,
  pub is_historical:      bool,
  pub is_modern:          bool,
  pub is_dbbe:            bool,
  /// Id of the origination fact this row was joined on.
  pub origination_fact:   Option<i64>,
  pub origination_region: Option<i64>,
}

/// `(id, name)` vocabulary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRow {
  pub id:   i64,
  pub name: String,
}

/// `(owner, member)` association row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRow {
  pub owner_id:  i64,
  pub member_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRow {
  pub id:        i64,
  pub name:      Option<String>,
  pub region_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRelationRow {
  pub type_id:         i64,
  pub related_type_id: i64,
  pub definition_id:   i64,
  pub definition:      String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiblioRow {
  pub id:              i64,
  pub biblio_type:     BiblioType,
  pub created:         Option<String>,
  pub modified:        Option<String>,
  pub public_comment:  Option<String>,
  pub private_comment: Option<String>,
  pub details:         BiblioDetails,
}

/// An untyped reference edge from a bibliography entry to some entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceRow {
  pub biblio_id:     i64,
  pub target_id:     i64,
  pub page_start:    Option<String>,
  pub page_end:      Option<String>,
  pub url:           Option<String>,
  pub source_remark: Option<String>,
  pub image:         Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalIssueRow {
  pub id:          i64,
  pub journal_id:  i64,
  pub year:        Option<String>,
  pub series:      Option<String>,
  pub volume:      Option<String>,
  pub number:      Option<String>,
  pub forthcoming: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiblioRoleRow {
  pub biblio_id: i64,
  pub person_id: i64,
  pub role:      String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiblioManagementRow {
  pub biblio_id:  i64,
  pub management: NamedRow,
}

// ─── Relational source ───────────────────────────────────────────────────────

/// Read-only access to the relational source of truth.
pub trait RelationalSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Hierarchies ───────────────────────────────────────────────────────

  /// A single hierarchy node, `None` if it does not exist.
  fn hierarchy_node(
    &self,
    hierarchy: HierarchyKind,
    id: i64,
  ) -> impl Future<Output = Result<Option<HierarchyNode>, Self::Error>> + Send + '_;

  /// `(id, parent_id)` for those of `ids` that are content taxonomy nodes.
  fn content_parents<'a>(
    &'a self,
    ids: &'a [i64],
  ) -> impl Future<Output = Result<Vec<(i64, Option<i64>)>, Self::Error>> + Send + 'a;

  // ── Persons ───────────────────────────────────────────────────────────

  fn persons(&self) -> impl Future<Output = Result<Vec<PersonRow>, Self::Error>> + Send + '_;

  fn self_designations(
    &self,
  ) -> impl Future<Output = Result<Vec<NamedRow>, Self::Error>> + Send + '_;

  /// `(person, self designation)` pairs.
  fn person_self_designations(
    &self,
  ) -> impl Future<Output = Result<Vec<LinkRow>, Self::Error>> + Send + '_;

  fn offices(&self) -> impl Future<Output = Result<Vec<NamedRow>, Self::Error>> + Send + '_;

  /// `(person, office)` pairs.
  fn person_offices(&self) -> impl Future<Output = Result<Vec<LinkRow>, Self::Error>> + Send + '_;

  // ── Manuscripts ───────────────────────────────────────────────────────

  /// The institution holding a manuscript.
  fn manuscript_library(
    &self,
    manuscript_id: i64,
  ) -> impl Future<Output = Result<Option<LibraryRow>, Self::Error>> + Send + '_;

  /// Regions a manuscript was written at.
  fn written_regions(
    &self,
    manuscript_id: i64,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  // ── Occurrences and types ─────────────────────────────────────────────

  /// Pairs of distinct occurrences sharing a verse group or reconstructing
  /// the same target. Either order may be returned.
  fn related_occurrences(
    &self,
  ) -> impl Future<Output = Result<Vec<(i64, i64)>, Self::Error>> + Send + '_;

  /// Keywords flagged as subjects.
  fn subject_keywords(
    &self,
  ) -> impl Future<Output = Result<Vec<NamedRow>, Self::Error>> + Send + '_;

  /// `(type, number of verses)` as recorded upstream.
  fn poem_verse_counts(
    &self,
  ) -> impl Future<Output = Result<Vec<(i64, i64)>, Self::Error>> + Send + '_;

  fn type_relations(
    &self,
  ) -> impl Future<Output = Result<Vec<TypeRelationRow>, Self::Error>> + Send + '_;

  // ── Bibliographies ────────────────────────────────────────────────────

  /// Every bibliography entry across the subtype tables.
  fn bibliographies(&self) -> impl Future<Output = Result<Vec<BiblioRow>, Self::Error>> + Send + '_;

  /// `(id, kind)` for every entity that can be the target of a reference.
  /// An id may be reported under several kinds.
  fn entity_kinds(
    &self,
  ) -> impl Future<Output = Result<Vec<(i64, EntityKind)>, Self::Error>> + Send + '_;

  fn references(&self) -> impl Future<Output = Result<Vec<ReferenceRow>, Self::Error>> + Send + '_;

  /// Journals with their titles.
  fn journals(&self) -> impl Future<Output = Result<Vec<NamedRow>, Self::Error>> + Send + '_;

  fn journal_issues(
    &self,
  ) -> impl Future<Output = Result<Vec<JournalIssueRow>, Self::Error>> + Send + '_;

  /// `(container, content)` document containment pairs.
  fn biblio_containers(
    &self,
  ) -> impl Future<Output = Result<Vec<LinkRow>, Self::Error>> + Send + '_;

  fn biblio_roles(
    &self,
  ) -> impl Future<Output = Result<Vec<BiblioRoleRow>, Self::Error>> + Send + '_;

  fn biblio_managements(
    &self,
  ) -> impl Future<Output = Result<Vec<BiblioManagementRow>, Self::Error>> + Send + '_;
}
