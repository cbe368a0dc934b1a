use dbbe_core::{
  document::VerseDoc,
  record::VerseRecord,
  source::{Collection, DocumentStore, RelationalSource},
};

use crate::{
  Pipeline, Result,
  step::{Progress, Step, StepReport, batches},
};

impl<D: DocumentStore, R: RelationalSource> Pipeline<D, R> {
  /// Verses point at occurrences and manuscripts that are written later.
  pub(crate) async fn migrate_verses(&mut self) -> Result<StepReport> {
    self.disable_foreign_keys(Step::Verse).await?;
    let result = self.write_verses().await;
    self.restore_foreign_keys(result).await
  }

  async fn write_verses(&self) -> Result<StepReport> {
    let mut report = StepReport::new(Step::Verse);
    let docs: Vec<(i64, VerseDoc)> = self
      .read_collection(Collection::Verses, self.options.page_size, &mut report)
      .await?;

    let records: Vec<VerseRecord> = docs
      .into_iter()
      .map(|(id, doc)| VerseRecord {
        id,
        text: doc.verse,
        order: doc.order,
        occurrence_id: doc.occurrence.and_then(|o| o.id),
        manuscript_id: doc.manuscript.and_then(|m| m.id),
        verse_group_id: doc.group_id,
      })
      .collect();

    let mut progress = Progress::new(Step::Verse, "verses", records.len());
    for batch in batches(records, self.options.batch_size) {
      let processed = batch.len();
      let written = self.store.write_verses(batch).await?;
      progress.batch(processed, written, &mut report);
    }
    Ok(report)
  }
}
