use std::collections::{HashMap, HashSet};

use dbbe_core::{
  biblio::BiblioType,
  entity::EntityKind,
  document::{BiblioTitleDoc, Document},
  record::{BiblioRecord, JournalIssueRecord},
  source::{Collection, DocumentStore, RelationalSource},
};
use dbbe_store_sqlite::SchemaPart;
use tracing::{info, warn};

use crate::{
  Error, Pipeline, Result, linker,
  step::{Progress, Step, StepReport, batches},
};

impl<D: DocumentStore, R: RelationalSource> Pipeline<D, R> {
  /// Bibliography entries come from the relational source; only their
  /// display titles live in the document store.
  pub(crate) async fn migrate_bibliographies(&mut self) -> Result<StepReport> {
    let mut report = StepReport::new(Step::Bibliography);
    self.store.ensure_schema(SchemaPart::Bibliography).await?;

    let rows = self.relational.bibliographies().await.map_err(Error::upstream)?;
    let kinds: HashMap<i64, BiblioType> = rows.iter().map(|r| (r.id, r.biblio_type)).collect();
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut titles = self.biblio_titles(&ids, &mut report).await?;

    let records: Vec<BiblioRecord> = rows
      .into_iter()
      .map(|row| {
        let title = titles.remove(&row.id).unwrap_or_default();
        BiblioRecord {
          id:              row.id,
          biblio_type:     row.biblio_type,
          title_sort_key:  title.title_sort_key.or_else(|| title.title.clone()),
          title:           title.title,
          created:         row.created,
          modified:        row.modified,
          public_comment:  row.public_comment,
          private_comment: self.private(row.private_comment),
          details:         row.details,
        }
      })
      .collect();

    let mut progress = Progress::new(Step::Bibliography, "bibliographies", records.len());
    for batch in batches(records, self.options.batch_size) {
      let processed = batch.len();
      let written = self.store.write_bibliographies(batch).await?;
      progress.batch(processed, written, &mut report);
    }

    self.write_references(&kinds, &mut report).await?;
    let issues = self.write_journals(&mut report).await?;

    let containers = self.relational.biblio_containers().await.map_err(Error::upstream)?;
    let containers = linker::containers(&containers, &kinds, &issues);
    report.skipped_edges += containers.skipped;
    report.add(self.store.write_containers(containers.links).await?);

    let managements = self.relational.biblio_managements().await.map_err(Error::upstream)?;
    let managements = linker::managements(managements, &kinds);
    report.add(self.store.write_biblio_managements(managements.links).await?);

    let roles = self.relational.biblio_roles().await.map_err(Error::upstream)?;
    let roles = linker::roles(roles, &kinds);
    report.skipped_edges += roles.skipped;
    report.add(self.store.write_biblio_roles(roles.links).await?);

    Ok(report)
  }

  /// Fetches display titles in chunks. Entries missing from the document
  /// store keep no title.
  async fn biblio_titles(
    &self,
    ids: &[i64],
    report: &mut StepReport,
  ) -> Result<HashMap<i64, BiblioTitleDoc>> {
    let mut titles = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(self.options.multi_get_chunk.max(1)) {
      let keys: Vec<String> = chunk.iter().map(i64::to_string).collect();
      let found = self
        .documents
        .multi_get(Collection::Bibliographies, &keys)
        .await
        .map_err(Error::upstream)?;

      for (key, source) in found {
        let (Ok(id), Some(source)) = (key.parse::<i64>(), source) else {
          continue;
        };
        match Document::new(key, source).parse::<BiblioTitleDoc>() {
          Ok(doc) => {
            titles.insert(id, doc);
          }
          Err(e) => {
            warn!(error = %e, "unreadable bibliography title");
            report.warnings += 1;
          }
        }
      }
    }
    info!(requested = ids.len(), found = titles.len(), "fetched bibliography titles");
    Ok(titles)
  }

  async fn write_references(
    &mut self,
    kinds: &HashMap<i64, BiblioType>,
    report: &mut StepReport,
  ) -> Result<()> {
    let withheld = self.withheld_types(report).await?;
    let targets: Vec<(i64, EntityKind)> = self
      .relational
      .entity_kinds()
      .await
      .map_err(Error::upstream)?
      .into_iter()
      .filter(|(id, kind)| *kind != EntityKind::Type || !withheld.contains(id))
      .collect();
    let entities = linker::entity_index(targets);
    report.warnings += entities.conflicts().len();

    let rows = self.relational.references().await.map_err(Error::upstream)?;
    let references = linker::references(rows, kinds, &entities);
    report.skipped_edges += references.skipped;

    let mut progress = Progress::new(Step::Bibliography, "references", references.links.len());
    for batch in batches(references.links, self.options.batch_size) {
      let processed = batch.len();
      let written = self.store.write_references(batch).await?;
      progress.batch(processed, written, report);
    }
    Ok(())
  }

  /// Writes journals and their issues and returns the issue ids.
  async fn write_journals(&self, report: &mut StepReport) -> Result<HashSet<i64>> {
    let journals: Vec<(i64, Option<String>)> = self
      .relational
      .journals()
      .await
      .map_err(Error::upstream)?
      .into_iter()
      .map(|j| (j.id, Some(j.name)))
      .collect();
    let issues: Vec<JournalIssueRecord> = self
      .relational
      .journal_issues()
      .await
      .map_err(Error::upstream)?
      .into_iter()
      .map(|i| JournalIssueRecord {
        id:         i.id,
        journal_id: i.journal_id,
        title:      JournalIssueRecord::compose_title(
          i.year.as_deref(),
          i.series.as_deref(),
          i.volume.as_deref(),
          i.number.as_deref(),
          i.forthcoming,
        ),
      })
      .collect();

    let ids = issues.iter().map(|i| i.id).collect();
    report.add(self.store.write_journals(journals, issues).await?);
    Ok(ids)
  }
}
