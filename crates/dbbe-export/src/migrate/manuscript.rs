use dbbe_core::{
  document::{ManuscriptDoc, role_refs},
  hierarchy::HierarchyKind,
  record::{Identification, LibraryRecord, ManuscriptRecord},
  source::{Collection, DocumentStore, RelationalSource},
};

use crate::{
  Error, Pipeline, Result,
  step::{Progress, Step, StepReport, batches},
};

impl<D: DocumentStore, R: RelationalSource> Pipeline<D, R> {
  pub(crate) async fn migrate_manuscripts(&mut self) -> Result<StepReport> {
    let mut report = StepReport::new(Step::Manuscript);
    let docs: Vec<(i64, ManuscriptDoc)> = self
      .read_collection(Collection::Manuscripts, self.options.page_size, &mut report)
      .await?;

    let mut progress = Progress::new(Step::Manuscript, "manuscripts", docs.len());
    for batch in batches(docs, self.options.batch_size) {
      let mut records = Vec::with_capacity(batch.len());
      for (id, doc) in batch {
        records.push(self.manuscript_record(id, doc).await?);
      }
      let processed = records.len();
      let written = self.store.write_manuscripts(records).await?;
      progress.batch(processed, written, &mut report);
    }
    Ok(report)
  }

  async fn manuscript_record(&mut self, id: i64, doc: ManuscriptDoc) -> Result<ManuscriptRecord> {
    let library = match self
      .relational
      .manuscript_library(id)
      .await
      .map_err(Error::upstream)?
    {
      Some(row) => Some(LibraryRecord {
        id:     row.id,
        name:   row.name,
        region: self
          .hierarchy
          .chain_opt(&self.relational, HierarchyKind::Region, row.region_id)
          .await?,
      }),
      None => None,
    };

    // Documents list every level of the content taxonomy; only the most
    // specific nodes are attached.
    let content_ids: Vec<i64> = doc.content.iter().filter_map(|c| c.id).collect();
    let content = self
      .hierarchy
      .content_leaves(&self.relational, &content_ids)
      .await?;

    let mut written_at = Vec::new();
    for region in self
      .relational
      .written_regions(id)
      .await
      .map_err(Error::upstream)?
    {
      let chain = self
        .hierarchy
        .chain(&self.relational, HierarchyKind::Region, region)
        .await?;
      if !chain.is_empty() {
        written_at.push(chain);
      }
    }

    Ok(ManuscriptRecord {
      id,
      roles: role_refs(&doc.rest),
      identifications: doc
        .diktyon
        .iter()
        .map(|d| Identification::new("diktyon", d.clone()))
        .collect(),
      name: doc.name,
      shelf: doc.shelf,
      completion_floor: doc.completion_floor,
      completion_ceiling: doc.completion_ceiling,
      created: doc.created,
      modified: doc.modified,
      number_of_occurrences: doc.number_of_occurrences,
      library,
      collection: doc.collection.filter(|c| c.id.is_some()),
      content,
      written_at,
      management: doc.management,
      acknowledgements: doc.acknowledgement,
    })
  }
}
