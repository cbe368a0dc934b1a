use std::collections::{BTreeSet, HashMap};

use dbbe_core::{
  document::{NamedRef, OccurrenceDoc, role_refs},
  record::{OccurrenceRecord, Relation},
  source::{Collection, DocumentStore, NamedRow, RelationalSource},
};

use crate::{
  Error, Pipeline, Result,
  step::{Progress, Step, StepReport, batches},
};

/// The single relation kind between occurrences: sharing a verse.
const VERSE_RELATED_ID: i64 = 0;
const VERSE_RELATED: &str = "verse_related";

impl<D: DocumentStore, R: RelationalSource> Pipeline<D, R> {
  /// Occurrences may name manuscripts missing from the export.
  pub(crate) async fn migrate_occurrences(&mut self) -> Result<StepReport> {
    self.disable_foreign_keys(Step::Occurrence).await?;
    let result = self.write_occurrences().await;
    self.restore_foreign_keys(result).await
  }

  async fn write_occurrences(&self) -> Result<StepReport> {
    let mut report = StepReport::new(Step::Occurrence);
    let keywords = self.relational.subject_keywords().await.map_err(Error::upstream)?;
    let docs: Vec<(i64, OccurrenceDoc)> = self
      .read_collection(
        Collection::Occurrences,
        self.options.occurrence_page_size,
        &mut report,
      )
      .await?;

    let records: Vec<OccurrenceRecord> = docs
      .into_iter()
      .map(|(id, doc)| OccurrenceRecord {
        id,
        manuscript_id: doc.manuscript.and_then(|m| m.id),
        roles: role_refs(&doc.rest),
        keywords: subject_keywords(&doc.subject, &keywords),
        created: doc.created,
        modified: doc.modified,
        public_comment: doc.public_comment,
        private_comment: self.private(doc.private_comment),
        is_dbbe: doc.dbbe,
        incipit: doc.incipit,
        text_stemmer: doc.text_stemmer,
        text_original: doc.text_original,
        location: doc.location,
        date_floor_year: doc.date_floor_year,
        date_ceiling_year: doc.date_ceiling_year,
        palaeographical_info: doc.palaeographical_info,
        contextual_info: doc.contextual_info,
        title: doc.title_original,
        genres: doc.genre,
        metres: doc.metre,
        management: doc.management,
        acknowledgements: doc.acknowledgement,
        text_status: doc.text_status.filter(|s| s.id.is_some()),
      })
      .collect();

    let mut progress = Progress::new(Step::Occurrence, "occurrences", records.len());
    for batch in batches(records, self.options.batch_size) {
      let processed = batch.len();
      let written = self.store.write_occurrences(batch).await?;
      progress.batch(processed, written, &mut report);
    }

    let pairs = self.relational.related_occurrences().await.map_err(Error::upstream)?;
    let relations = verse_relations(pairs);
    let mut progress = Progress::new(Step::Occurrence, "occurrence relations", relations.len());
    for batch in batches(relations, self.options.batch_size) {
      let processed = batch.len();
      let written = self.store.write_occurrence_relations(batch).await?;
      progress.batch(processed, written, &mut report);
    }
    Ok(report)
  }
}

/// Keeps the subjects that are keywords, named as the keyword vocabulary
/// names them. Other subjects are persons and are not keywords.
pub(crate) fn subject_keywords(subjects: &[NamedRef], keywords: &[NamedRow]) -> Vec<NamedRef> {
  let names: HashMap<i64, &str> = keywords.iter().map(|k| (k.id, k.name.as_str())).collect();
  subjects
    .iter()
    .filter_map(|s| {
      let id = s.id?;
      let name = names.get(&id)?;
      Some(NamedRef {
        id:   Some(id),
        name: Some((*name).to_owned()),
      })
    })
    .collect()
}

/// One canonical edge per unordered pair; self pairs are dropped.
fn verse_relations(pairs: Vec<(i64, i64)>) -> Vec<Relation> {
  let mut seen = BTreeSet::new();
  pairs
    .into_iter()
    .filter_map(|(a, b)| Relation::undirected(a, b, VERSE_RELATED_ID, VERSE_RELATED))
    .filter(|r| seen.insert((r.low, r.high)))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_keyword_subjects_are_kept() {
    let subjects = vec![
      NamedRef {
        id:   Some(4),
        name: Some("Love".into()),
      },
      NamedRef {
        id:   Some(900),
        name: Some("John Tzetzes".into()),
      },
      NamedRef::default(),
    ];
    let keywords = vec![NamedRow {
      id:   4,
      name: "love".into(),
    }];

    let kept = subject_keywords(&subjects, &keywords);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name.as_deref(), Some("love"));
  }

  #[test]
  fn verse_relations_are_deduplicated() {
    let relations = verse_relations(vec![(3, 1), (1, 3), (2, 2), (1, 2)]);
    let pairs: Vec<_> = relations.iter().map(|r| (r.low, r.high)).collect();
    assert_eq!(pairs, [(1, 3), (1, 2)]);
    assert!(relations.iter().all(|r| r.definition == VERSE_RELATED));
  }
}
