//! Verse rows and the stubs they need.

use rusqlite::{Connection, params};

use dbbe_core::record::VerseRecord;

use crate::{BatchReport, OutputStore, Result, row};

impl OutputStore {
  /// Writes one batch of verses. Occurrences and manuscripts they point at
  /// are stubbed so the later migrators can fill them in.
  pub async fn write_verses(&self, verses: Vec<VerseRecord>) -> Result<BatchReport> {
    self
      .transaction(move |conn| {
        let mut report = BatchReport::default();
        for verse in &verses {
          write_verse(conn, verse)?;
          report.written += 1;
        }
        Ok(report)
      })
      .await
  }
}

fn write_verse(conn: &Connection, verse: &VerseRecord) -> Result<()> {
  if let Some(occurrence_id) = verse.occurrence_id {
    row::stub(conn, "occurrence", occurrence_id)?;

    if let Some(manuscript_id) = verse.manuscript_id {
      row::stub(conn, "manuscript", manuscript_id)?;
      conn
        .prepare_cached(
          "UPDATE occurrence SET manuscript_id = ?2 WHERE id = ?1 AND manuscript_id IS NULL",
        )?
        .execute(params![occurrence_id, manuscript_id])?;
    }
  }

  row::write(conn, "verse", &[
    ("id", &verse.id),
    ("text", &verse.text),
    ("order_in_occurrence", &verse.order),
    ("occurrence_id", &verse.occurrence_id),
    ("verse_group_id", &verse.verse_group_id),
  ])?;
  Ok(())
}
