//! Type rows (reconstructed poems) and type-to-type relations.

use rusqlite::Connection;

use dbbe_core::record::{Relation, TypeRecord};

use crate::{
  BatchReport, LookupKind, OutputStore, Result,
  lookup::{Lookups, link_all, link_roles},
  occurrence::write_relations,
  row,
};

impl OutputStore {
  pub async fn write_types(&self, types: Vec<TypeRecord>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let lookups = Lookups::new(conn);
        let mut report = BatchReport::default();
        for ty in &types {
          report.skipped_edges += write_type(conn, &lookups, ty)?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }

  /// Writes canonical `(lower, higher)` type relations whose endpoints exist.
  pub async fn write_type_relations(&self, relations: Vec<Relation>) -> Result<BatchReport> {
    self
      .transaction(move |conn| write_relations(conn, "type", &relations))
      .await
  }
}

fn write_type(conn: &Connection, lookups: &Lookups<'_>, t: &TypeRecord) -> Result<usize> {
  row::write(conn, "type", &[
    ("id", &t.id),
    ("text_stemmer", &t.text_stemmer),
    ("text_original", &t.text_original),
    ("lemma", &t.lemma),
    ("incipit", &t.incipit),
    ("created", &t.created),
    ("modified", &t.modified),
    ("public_comment", &t.public_comment),
    ("private_comment", &t.private_comment),
    ("title", &t.title),
    ("number_of_verses", &t.number_of_verses),
  ])?;

  link_all(conn, lookups, "type", t.id, LookupKind::Genre, &t.genres)?;
  link_all(conn, lookups, "type", t.id, LookupKind::Metre, &t.metres)?;
  link_all(conn, lookups, "type", t.id, LookupKind::Tag, &t.tags)?;
  link_all(conn, lookups, "type", t.id, LookupKind::Keyword, &t.keywords)?;
  link_all(conn, lookups, "type", t.id, LookupKind::Management, &t.management)?;
  link_all(conn, lookups, "type", t.id, LookupKind::Acknowledgement, &t.acknowledgements)?;
  let editorial_status = t.editorial_status.as_slice();
  link_all(conn, lookups, "type", t.id, LookupKind::EditorialStatus, editorial_status)?;
  link_all(conn, lookups, "type", t.id, LookupKind::TextStatus, t.text_status.as_slice())?;

  let mut skipped = 0;
  for &occurrence_id in &t.occurrence_ids {
    if !row::exists(conn, "occurrence", occurrence_id)? {
      skipped += 1;
      continue;
    }
    row::write(conn, "type_occurrence", &[
      ("type_id", &t.id),
      ("occurrence_id", &occurrence_id),
    ])?;
  }

  Ok(skipped + link_roles(conn, lookups, "type", t.id, &t.roles)?)
}
