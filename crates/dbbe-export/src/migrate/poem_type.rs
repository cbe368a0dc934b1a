use std::collections::{BTreeSet, HashMap};

use dbbe_core::{
  document::{TypeDoc, TypeVisibilityDoc, role_refs},
  record::{Relation, TypeRecord},
  source::{Collection, DocumentStore, RelationalSource, TypeRelationRow},
};
use tracing::info;

use super::occurrence::subject_keywords;
use crate::{
  Error, Pipeline, Result,
  step::{Progress, Step, StepReport, batches},
};

impl<D: DocumentStore, R: RelationalSource> Pipeline<D, R> {
  pub(crate) async fn migrate_types(&mut self) -> Result<StepReport> {
    let mut report = StepReport::new(Step::Type);
    let keywords = self.relational.subject_keywords().await.map_err(Error::upstream)?;
    let verse_counts: HashMap<i64, i64> = self
      .relational
      .poem_verse_counts()
      .await
      .map_err(Error::upstream)?
      .into_iter()
      .collect();
    let docs: Vec<(i64, TypeDoc)> = self
      .read_collection(Collection::Types, self.options.page_size, &mut report)
      .await?;

    let mut withheld = self.withheld.clone().unwrap_or_default();
    if self.options.public_release {
      withheld.extend(docs.iter().filter(|(_, doc)| doc.public == Some(false)).map(|(id, _)| *id));
    }

    let mut records = Vec::with_capacity(docs.len());
    for (id, doc) in docs {
      if withheld.contains(&id) {
        continue;
      }
      records.push(TypeRecord {
        id,
        number_of_verses: verse_counts
          .get(&id)
          .copied()
          .or_else(|| doc.embedded_verse_count()),
        roles: role_refs(&doc.rest),
        keywords: subject_keywords(&doc.subject, &keywords),
        text_stemmer: doc.text_stemmer,
        text_original: doc.text_original,
        lemma: doc.lemma,
        incipit: doc.incipit,
        created: doc.created,
        modified: doc.modified,
        public_comment: doc.public_comment,
        private_comment: self.private(doc.private_comment),
        title: doc.title_original,
        genres: doc.genre,
        metres: doc.metre,
        tags: doc.tag,
        management: doc.management,
        acknowledgements: doc.acknowledgement,
        editorial_status: doc.critical_status.filter(|s| s.id.is_some()),
        text_status: doc.text_status.filter(|s| s.id.is_some()),
        occurrence_ids: doc.occurrence_ids,
      });
    }
    if !withheld.is_empty() {
      info!(withheld = withheld.len(), "left out non-public types");
    }

    let mut progress = Progress::new(Step::Type, "types", records.len());
    for batch in batches(records, self.options.batch_size) {
      let processed = batch.len();
      let written = self.store.write_types(batch).await?;
      progress.batch(processed, written, &mut report);
    }

    let rows = self.relational.type_relations().await.map_err(Error::upstream)?;
    let relations = type_relations(rows, &withheld);
    let mut progress = Progress::new(Step::Type, "type relations", relations.len());
    for batch in batches(relations, self.options.batch_size) {
      let processed = batch.len();
      let written = self.store.write_type_relations(batch).await?;
      progress.batch(processed, written, &mut report);
    }
    Ok(report)
  }

  /// Ids of the types a public release leaves out. Always empty otherwise.
  ///
  /// Read ahead of the type step so earlier steps do not create rows or
  /// edges for them.
  pub(crate) async fn withheld_types(&mut self, report: &mut StepReport) -> Result<BTreeSet<i64>> {
    if !self.options.public_release {
      return Ok(BTreeSet::new());
    }
    if let Some(ids) = &self.withheld {
      return Ok(ids.clone());
    }
    let ids: BTreeSet<i64> = self
      .read_collection::<TypeVisibilityDoc>(Collection::Types, self.options.page_size, report)
      .await?
      .into_iter()
      .filter(|(_, doc)| doc.public == Some(false))
      .map(|(id, _)| id)
      .collect();
    info!(withheld = ids.len(), "read type visibility");
    self.withheld = Some(ids.clone());
    Ok(ids)
  }
}

/// Canonical type relations between exported types. When a pair is recorded
/// in both directions the first definition read wins.
fn type_relations(rows: Vec<TypeRelationRow>, withheld: &BTreeSet<i64>) -> Vec<Relation> {
  let mut seen = BTreeSet::new();
  rows
    .into_iter()
    .filter(|r| !withheld.contains(&r.type_id) && !withheld.contains(&r.related_type_id))
    .filter_map(|r| {
      Relation::undirected(r.type_id, r.related_type_id, r.definition_id, r.definition)
    })
    .filter(|r| seen.insert((r.low, r.high)))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(type_id: i64, related_type_id: i64, definition_id: i64) -> TypeRelationRow {
    TypeRelationRow {
      type_id,
      related_type_id,
      definition_id,
      definition: format!("definition {definition_id}"),
    }
  }

  #[test]
  fn both_directions_collapse_to_one_edge() {
    let rows = vec![row(8, 3, 1), row(3, 8, 2), row(4, 4, 1), row(3, 9, 2)];
    let relations = type_relations(rows, &BTreeSet::new());
    assert_eq!(relations.len(), 2);
    assert_eq!((relations[0].low, relations[0].high), (3, 8));
    assert_eq!(relations[0].definition_id, 1);
    assert_eq!((relations[1].low, relations[1].high), (3, 9));
  }

  #[test]
  fn relations_of_withheld_types_are_dropped() {
    let rows = vec![row(8, 3, 1), row(3, 9, 2), row(9, 4, 1)];
    let relations = type_relations(rows, &BTreeSet::from([9]));
    assert_eq!(relations.len(), 1);
    assert_eq!((relations[0].low, relations[0].high), (3, 8));
  }
}
