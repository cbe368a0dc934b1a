//! Manuscript rows, their library, content and written-at links.

use rusqlite::Connection;

use dbbe_core::{hierarchy::HierarchyKind, record::ManuscriptRecord};

use crate::{
  BatchReport, LookupKind, OutputStore, Result, hierarchy,
  lookup::{Lookups, link_all, link_roles},
  row,
};

impl OutputStore {
  pub async fn write_manuscripts(&self, manuscripts: Vec<ManuscriptRecord>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let lookups = Lookups::new(conn);
        let mut report = BatchReport::default();
        for manuscript in &manuscripts {
          report.skipped_edges += write_manuscript(conn, &lookups, manuscript)?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }
}

fn write_manuscript(
  conn: &Connection,
  lookups: &Lookups<'_>,
  m: &ManuscriptRecord,
) -> Result<usize> {
  let library_id = match &m.library {
    Some(library) => {
      let location_id = hierarchy::insert_chain(conn, HierarchyKind::Region, &library.region)?;
      row::write(conn, "library", &[
        ("id", &library.id),
        ("name", &library.name),
        ("location_id", &location_id),
      ])?;
      Some(library.id)
    }
    None => None,
  };

  let collection_id = match &m.collection {
    Some(collection) => lookups.resolve_or_create(LookupKind::Collection, collection)?,
    None => None,
  };

  row::write(conn, "manuscript", &[
    ("id", &m.id),
    ("name", &m.name),
    ("shelf", &m.shelf),
    ("completion_floor", &m.completion_floor),
    ("completion_ceiling", &m.completion_ceiling),
    ("created", &m.created),
    ("modified", &m.modified),
    ("number_of_occurrences", &m.number_of_occurrences),
    ("library_id", &library_id),
    ("collection_id", &collection_id),
  ])?;

  for chain in &m.content {
    if let Some(content_id) = hierarchy::insert_chain(conn, HierarchyKind::Content, chain)? {
      row::write(conn, "manuscript_content", &[
        ("manuscript_id", &m.id),
        ("content_id", &content_id),
      ])?;
    }
  }

  for chain in &m.written_at {
    if let Some(location_id) = hierarchy::insert_chain(conn, HierarchyKind::Region, chain)? {
      row::write(conn, "manuscript_location", &[
        ("manuscript_id", &m.id),
        ("location_id", &location_id),
      ])?;
    }
  }

  for ident in &m.identifications {
    let ident_id = lookups.identification(ident)?;
    row::write(conn, "manuscript_identification", &[
      ("manuscript_id", &m.id),
      ("identification_id", &ident_id),
    ])?;
  }

  link_all(conn, lookups, "manuscript", m.id, LookupKind::Management, &m.management)?;
  link_all(conn, lookups, "manuscript", m.id, LookupKind::Acknowledgement, &m.acknowledgements)?;
  link_roles(conn, lookups, "manuscript", m.id, &m.roles)
}
