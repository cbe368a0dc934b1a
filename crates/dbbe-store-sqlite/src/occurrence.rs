//! Occurrence rows and occurrence-to-occurrence relations.

use rusqlite::Connection;

use dbbe_core::record::{OccurrenceRecord, Relation};

use crate::{
  BatchReport, LookupKind, OutputStore, Result,
  lookup::{Lookups, link_all, link_roles},
  row,
};

impl OutputStore {
  pub async fn write_occurrences(&self, occurrences: Vec<OccurrenceRecord>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let lookups = Lookups::new(conn);
        let mut report = BatchReport::default();
        for occurrence in &occurrences {
          report.skipped_edges += write_occurrence(conn, &lookups, occurrence)?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }

  /// Writes relation edges whose endpoints both exist; others are skipped.
  pub async fn write_occurrence_relations(&self, relations: Vec<Relation>) -> Result<BatchReport> {
    self
      .transaction(move |conn| write_relations(conn, "occurrence", &relations))
      .await
  }
}

fn write_occurrence(
  conn: &Connection,
  lookups: &Lookups<'_>,
  o: &OccurrenceRecord,
) -> Result<usize> {
  if let Some(manuscript_id) = o.manuscript_id {
    row::stub(conn, "manuscript", manuscript_id)?;
  }

  row::write(conn, "occurrence", &[
    ("id", &o.id),
    ("manuscript_id", &o.manuscript_id),
    ("created", &o.created),
    ("modified", &o.modified),
    ("public_comment", &o.public_comment),
    ("private_comment", &o.private_comment),
    ("is_dbbe", &o.is_dbbe),
    ("incipit", &o.incipit),
    ("text_stemmer", &o.text_stemmer),
    ("text_original", &o.text_original),
    ("location", &o.location),
    ("date_floor_year", &o.date_floor_year),
    ("date_ceiling_year", &o.date_ceiling_year),
    ("palaeographical_info", &o.palaeographical_info),
    ("contextual_info", &o.contextual_info),
    ("title", &o.title),
  ])?;

  link_all(conn, lookups, "occurrence", o.id, LookupKind::Genre, &o.genres)?;
  link_all(conn, lookups, "occurrence", o.id, LookupKind::Metre, &o.metres)?;
  link_all(conn, lookups, "occurrence", o.id, LookupKind::Keyword, &o.keywords)?;
  link_all(conn, lookups, "occurrence", o.id, LookupKind::Management, &o.management)?;
  link_all(conn, lookups, "occurrence", o.id, LookupKind::Acknowledgement, &o.acknowledgements)?;
  link_all(conn, lookups, "occurrence", o.id, LookupKind::TextStatus, o.text_status.as_slice())?;
  link_roles(conn, lookups, "occurrence", o.id, &o.roles)
}

/// Shared by occurrence and type relations: `{owner}_related_{owner}` with
/// the definition stored in `{owner}_relation_definition`.
pub(crate) fn write_relations(
  conn: &Connection,
  owner: &str,
  relations: &[Relation],
) -> Result<BatchReport> {
  let lookups = Lookups::new(conn);
  let join = format!("{owner}_related_{owner}");
  let definitions = format!("{owner}_relation_definition");
  let owner_col = format!("{owner}_id");
  let related_col = format!("related_{owner}_id");
  let mut report = BatchReport::default();

  for relation in relations {
    if !row::exists(conn, owner, relation.low)? || !row::exists(conn, owner, relation.high)? {
      tracing::debug!(
        owner,
        low = relation.low,
        high = relation.high,
        "relation endpoint missing; skipping"
      );
      report.skipped_edges += 1;
      continue;
    }
    let definition_id =
      lookups.relation_definition(&definitions, relation.definition_id, &relation.definition)?;
    report.written += row::write(conn, &join, &[
      (owner_col.as_str(), &relation.low),
      (related_col.as_str(), &relation.high),
      ("relation_definition_id", &definition_id),
    ])?;
  }
  Ok(report)
}
