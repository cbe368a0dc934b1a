//! Person rows and their associations.

use rusqlite::Connection;

use dbbe_core::{hierarchy::HierarchyKind, record::PersonRecord};

use crate::{
  BatchReport, LookupKind, OutputStore, Result, hierarchy,
  lookup::{Lookups, link_all},
  row,
};

impl OutputStore {
  pub async fn write_persons(&self, persons: Vec<PersonRecord>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let lookups = Lookups::new(conn);
        let mut report = BatchReport::default();
        for person in &persons {
          write_person(conn, &lookups, person)?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }
}

fn write_person(conn: &Connection, lookups: &Lookups<'_>, p: &PersonRecord) -> Result<()> {
  let location_id = hierarchy::insert_chain(conn, HierarchyKind::Region, &p.origination)?;

  row::write(conn, "person", &[
    ("id", &p.id),
    ("first_name", &p.first_name),
    ("last_name", &p.last_name),
    ("full_name", &p.full_name),
    ("born_date_floor_year", &p.born.floor),
    ("born_date_ceiling_year", &p.born.ceiling),
    ("death_date_floor_year", &p.died.floor),
    ("death_date_ceiling_year", &p.died.ceiling),
    ("is_historical", &p.is_historical),
    ("is_modern", &p.is_modern),
    ("is_dbbe", &p.is_dbbe),
    ("created", &p.created),
    ("modified", &p.modified),
    ("public_comment", &p.public_comment),
    ("private_comment", &p.private_comment),
    ("location_id", &location_id),
  ])?;

  link_all(conn, lookups, "person", p.id, LookupKind::Management, &p.management)?;
  link_all(conn, lookups, "person", p.id, LookupKind::Acknowledgement, &p.acknowledgements)?;
  link_all(conn, lookups, "person", p.id, LookupKind::SelfDesignation, &p.self_designations)?;
  link_all(conn, lookups, "person", p.id, LookupKind::Office, &p.offices)?;

  for ident in &p.identifications {
    let ident_id = lookups.identification(ident)?;
    row::write(conn, "person_identification", &[
      ("person_id", &p.id),
      ("identification_id", &ident_id),
    ])?;
  }
  Ok(())
}
