//! The bibliography family: subtype rows, journals, containment, references,
//! person roles and management links.

use rusqlite::{Connection, ToSql};

use dbbe_core::record::{
  BiblioDetails, BiblioManagementLink, BiblioRecord, BiblioRoleLink, ContainerLink,
  JournalIssueRecord, ReferenceLink,
};

use crate::{
  BatchReport, LookupKind, OutputStore, Result,
  lookup::{Lookups, link_all, link_role},
  row,
};

impl OutputStore {
  /// Upserts bibliography entries into their subtype tables.
  pub async fn write_bibliographies(&self, records: Vec<BiblioRecord>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let mut report = BatchReport::default();
        for record in &records {
          write_bibliography(conn, record)?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }

  pub async fn write_journals(
    &self,
    journals: Vec<(i64, Option<String>)>,
    issues: Vec<JournalIssueRecord>,
  ) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let mut report = BatchReport::default();
        for (id, title) in &journals {
          row::write(conn, "journal", &[("id", id), ("title", title), ("title_sort_key", title)])?;
          report.written += 1;
        }
        for issue in &issues {
          row::write(conn, "journal_issue", &[
            ("id", &issue.id),
            ("journal_id", &issue.journal_id),
            ("title", &issue.title),
            ("title_sort_key", &issue.title),
          ])?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }

  /// Sets the container column of each linked entry.
  pub async fn write_containers(&self, links: Vec<ContainerLink>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let mut report = BatchReport::default();
        for link in &links {
          let Some(column) = link.biblio_type.container_column() else {
            report.skipped_edges += 1;
            continue;
          };
          row::write(conn, link.biblio_type.table(), &[
            ("id", &link.content_id),
            (column, &link.container_id),
          ])?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }

  /// Writes resolved reference edges into their `{entity}_{subtype}` tables.
  /// Missing entity rows are stubbed for their own migrator to fill in.
  pub async fn write_references(&self, links: Vec<ReferenceLink>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let mut report = BatchReport::default();
        for link in &links {
          row::stub(conn, link.entity.table(), link.entity_id)?;
          let entity_col = link.entity.id_column();
          let bib_col = link.biblio_type.id_column();
          report.written += row::write(conn, &link.biblio_type.reference_table(link.entity), &[
            (entity_col, &link.entity_id),
            (bib_col.as_str(), &link.biblio_id),
            ("page_start", &link.page_start),
            ("page_end", &link.page_end),
            ("raw_pages", &link.raw_pages),
            ("rel_url", &link.url),
            ("source_remark", &link.source_remark),
            ("image", &link.image),
          ])?;
        }
        Ok(report)
      })
      .await
  }

  pub async fn write_biblio_roles(&self, links: Vec<BiblioRoleLink>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let lookups = Lookups::new(conn);
        let mut report = BatchReport::default();
        for link in &links {
          let table = link.biblio_type.table();
          if !row::exists(conn, table, link.biblio_id)? {
            report.skipped_edges += 1;
            continue;
          }
          if link_role(conn, &lookups, table, link.biblio_id, &link.role, link.person_id)? {
            report.written += 1;
          } else {
            report.skipped_edges += 1;
          }
        }
        Ok(report)
      })
      .await
  }

  pub async fn write_biblio_managements(
    &self,
    links: Vec<BiblioManagementLink>,
  ) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let lookups = Lookups::new(conn);
        let mut report = BatchReport::default();
        for link in &links {
          let table = link.biblio_type.table();
          if !row::exists(conn, table, link.biblio_id)? {
            report.skipped_edges += 1;
            continue;
          }
          link_all(
            conn,
            &lookups,
            table,
            link.biblio_id,
            LookupKind::Management,
            std::slice::from_ref(&link.management),
          )?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }
}

fn write_bibliography(conn: &Connection, b: &BiblioRecord) -> Result<()> {
  let mut values: Vec<(&str, &dyn ToSql)> = vec![
    ("id", &b.id),
    ("title", &b.title),
    ("title_sort_key", &b.title_sort_key),
    ("created", &b.created),
    ("modified", &b.modified),
    ("public_comment", &b.public_comment),
    ("private_comment", &b.private_comment),
  ];

  match &b.details {
    BiblioDetails::None => {}
    BiblioDetails::BlogPost { url, post_date } => {
      values.push(("url", url));
      values.push(("post_date", post_date));
    }
    BiblioDetails::OnlineSource { url, last_accessed } => {
      values.push(("url", url));
      values.push(("last_accessed", last_accessed));
    }
    BiblioDetails::Phd {
      city,
      year,
      institution,
      volume,
      forthcoming,
    } => {
      values.push(("city", city));
      values.push(("year", year));
      values.push(("institution", institution));
      values.push(("volume", volume));
      values.push(("forthcoming", forthcoming));
    }
    BiblioDetails::BibVaria {
      city,
      year,
      institution,
    } => {
      values.push(("city", city));
      values.push(("year", year));
      values.push(("institution", institution));
    }
  }

  row::write(conn, b.biblio_type.table(), &values)?;
  Ok(())
}
