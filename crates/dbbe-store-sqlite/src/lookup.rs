//! Shared lookup resolution.
//!
//! Small vocabularies (roles, management tags, keywords, ...) are referenced
//! from many unrelated entity tables. [`Lookups`] is the only way writers
//! touch them: it resolves a reference to a row id, creating the row on first
//! sight.

use rusqlite::{Connection, OptionalExtension as _, params};

use dbbe_core::{
  document::{NamedRef, RoleRef},
  record::Identification,
};

use crate::{Result, row};

/// Lookup vocabularies. Roles are keyed by name, everything else by the
/// source id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
  Role,
  Management,
  Acknowledgement,
  SelfDesignation,
  Office,
  Keyword,
  Genre,
  Metre,
  Tag,
  TextStatus,
  EditorialStatus,
  Collection,
}

impl LookupKind {
  pub fn table(self) -> &'static str {
    match self {
      Self::Role => "role",
      Self::Management => "management",
      Self::Acknowledgement => "acknowledgement",
      Self::SelfDesignation => "self_designation",
      Self::Office => "office",
      Self::Keyword => "keyword",
      Self::Genre => "genre",
      Self::Metre => "metre",
      Self::Tag => "tag",
      Self::TextStatus => "text_status",
      Self::EditorialStatus => "editorial_status",
      Self::Collection => "collection",
    }
  }
}

/// Resolve-or-create over one connection (normally a batch transaction).
pub(crate) struct Lookups<'c> {
  conn: &'c Connection,
}

impl<'c> Lookups<'c> {
  pub(crate) fn new(conn: &'c Connection) -> Self { Self { conn } }

  /// Returns the row id for `reference`, inserting it if needed. References
  /// without the identifying part (a name for roles, an id otherwise) resolve
  /// to `None`.
  pub(crate) fn resolve_or_create(
    &self,
    kind: LookupKind,
    reference: &NamedRef,
  ) -> Result<Option<i64>> {
    match kind {
      LookupKind::Role => reference.name.as_deref().map(|name| self.role(name)).transpose(),
      _ => self.by_id(kind, reference),
    }
  }

  /// Case-insensitive role lookup.
  pub(crate) fn role(&self, name: &str) -> Result<i64> {
    let existing = self
      .conn
      .prepare_cached("SELECT id FROM role WHERE name = ?1")?
      .query_row([name], |r| r.get::<_, i64>(0))
      .optional()?;
    if let Some(id) = existing {
      return Ok(id);
    }

    row::write(self.conn, "role", &[("name", &name)])?;
    Ok(self.conn.last_insert_rowid())
  }

  fn by_id(&self, kind: LookupKind, reference: &NamedRef) -> Result<Option<i64>> {
    let Some(id) = reference.id else {
      return Ok(None);
    };
    let table = kind.table();

    let current: Option<Option<String>> = self
      .conn
      .prepare_cached(&format!("SELECT name FROM {table} WHERE id = ?1"))?
      .query_row([id], |r| r.get(0))
      .optional()?;

    match (current, reference.name.as_deref()) {
      (None, name) => {
        row::write(self.conn, table, &[("id", &id), ("name", &name)])?;
      }
      (Some(None), Some(name)) => {
        self
          .conn
          .prepare_cached(&format!("UPDATE {table} SET name = ?2 WHERE id = ?1 AND name IS NULL"))?
          .execute(params![id, name])?;
      }
      (Some(Some(kept)), Some(name)) if kept != name => {
        tracing::debug!(
          table,
          id,
          kept = %kept,
          ignored = %name,
          "lookup name differs; keeping first"
        );
      }
      _ => {}
    }
    Ok(Some(id))
  }

  /// Typed external identifier, unique per `(type, value)`.
  pub(crate) fn identification(&self, ident: &Identification) -> Result<i64> {
    row::write(self.conn, "identification", &[
      ("type", &ident.kind),
      ("identifier_value", &ident.value),
    ])?;
    let id = self
      .conn
      .prepare_cached("SELECT id FROM identification WHERE type = ?1 AND identifier_value = ?2")?
      .query_row(params![ident.kind, ident.value], |r| r.get(0))?;
    Ok(id)
  }

  /// Relation definitions are unique by text; the id stored first is kept.
  pub(crate) fn relation_definition(&self, table: &str, id: i64, definition: &str) -> Result<i64> {
    row::write(self.conn, table, &[("id", &id), ("definition", &definition)])?;
    let id = self
      .conn
      .prepare_cached(&format!("SELECT id FROM {table} WHERE definition = ?1"))?
      .query_row([definition], |r| r.get(0))?;
    Ok(id)
  }
}

// ─── Join helpers ────────────────────────────────────────────────────────────

/// Resolves every reference and links it to `owner` through the
/// `{owner}_{lookup}` join table.
pub(crate) fn link_all(
  conn: &Connection,
  lookups: &Lookups<'_>,
  owner: &str,
  owner_id: i64,
  kind: LookupKind,
  references: &[NamedRef],
) -> Result<()> {
  let join = format!("{owner}_{}", kind.table());
  let owner_col = format!("{owner}_id");
  let member_col = format!("{}_id", kind.table());

  for reference in references {
    if let Some(member_id) = lookups.resolve_or_create(kind, reference)? {
      row::write(conn, &join, &[
        (owner_col.as_str(), &owner_id),
        (member_col.as_str(), &member_id),
      ])?;
    }
  }
  Ok(())
}

/// Writes person-role edges for `owner`. An edge whose person has no row is
/// dropped; the number of dropped edges is returned.
pub(crate) fn link_roles(
  conn: &Connection,
  lookups: &Lookups<'_>,
  owner: &str,
  owner_id: i64,
  roles: &[RoleRef],
) -> Result<usize> {
  let mut skipped = 0;
  for role in roles {
    if !link_role(conn, lookups, owner, owner_id, role.role, role.person_id)? {
      skipped += 1;
    }
  }
  Ok(skipped)
}

/// Writes one person-role edge into `{owner}_person_role` if the person row
/// exists. Returns whether the edge was kept.
pub(crate) fn link_role(
  conn: &Connection,
  lookups: &Lookups<'_>,
  owner: &str,
  owner_id: i64,
  role: &str,
  person_id: i64,
) -> Result<bool> {
  if !row::exists(conn, "person", person_id)? {
    tracing::debug!(owner, owner_id, person_id, role, "person not migrated; dropping role edge");
    return Ok(false);
  }
  let role_id = lookups.role(role)?;
  let owner_col = format!("{owner}_id");
  row::write(conn, &format!("{owner}_person_role"), &[
    (owner_col.as_str(), &owner_id),
    ("person_id", &person_id),
    ("role_id", &role_id),
  ])?;
  Ok(true)
}
