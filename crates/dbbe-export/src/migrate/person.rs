use std::collections::{BTreeMap, BTreeSet, HashMap};

use dbbe_core::{
  document::{NamedRef, PersonDoc},
  hierarchy::HierarchyKind,
  record::{Identification, PersonRecord},
  source::{Collection, DocumentStore, LinkRow, NamedRow, PersonRow, RelationalSource},
};

use crate::{
  Error, Pipeline, Result,
  pipeline::fuzzy_date,
  step::{Progress, Step, StepReport, batches},
};

impl<D: DocumentStore, R: RelationalSource> Pipeline<D, R> {
  pub(crate) async fn migrate_persons(&mut self) -> Result<StepReport> {
    let mut report = StepReport::new(Step::Person);

    let rows = group_persons(self.relational.persons().await.map_err(Error::upstream)?)?;
    let self_designations = linked_names(
      self.relational.self_designations().await.map_err(Error::upstream)?,
      self
        .relational
        .person_self_designations()
        .await
        .map_err(Error::upstream)?,
    );
    let offices = linked_names(
      self.relational.offices().await.map_err(Error::upstream)?,
      self.relational.person_offices().await.map_err(Error::upstream)?,
    );
    let docs: HashMap<i64, PersonDoc> = self
      .read_collection::<PersonDoc>(Collection::Persons, self.options.page_size, &mut report)
      .await?
      .into_iter()
      .collect();

    // A person known to only one source is still exported.
    let ids: Vec<i64> = rows
      .keys()
      .chain(docs.keys())
      .copied()
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();

    let mut progress = Progress::new(Step::Person, "persons", ids.len());
    for batch in batches(ids, self.options.batch_size) {
      let mut records = Vec::with_capacity(batch.len());
      for id in &batch {
        let row = rows.get(id);
        let doc = docs.get(id).cloned().unwrap_or_default();
        let origination = self
          .hierarchy
          .chain_opt(
            &self.relational,
            HierarchyKind::Region,
            row.and_then(|r| r.origination_region),
          )
          .await?;

        records.push(PersonRecord {
          id: *id,
          first_name: row.and_then(|r| r.first_name.clone()),
          last_name: row.and_then(|r| r.last_name.clone()),
          full_name: doc.name.clone(),
          born: fuzzy_date(row.and_then(|r| r.born.as_deref()), *id, &mut report),
          died: fuzzy_date(row.and_then(|r| r.died.as_deref()), *id, &mut report),
          is_historical: row.is_some_and(|r| r.is_historical),
          is_modern: row.is_some_and(|r| r.is_modern),
          is_dbbe: row.is_some_and(|r| r.is_dbbe),
          identifications: doc
            .identifications()
            .into_iter()
            .map(|(kind, value)| Identification::new(kind, value))
            .collect(),
          created: doc.created,
          modified: doc.modified,
          public_comment: doc.public_comment,
          private_comment: self.private(doc.private_comment),
          origination,
          management: doc.management,
          acknowledgements: doc.acknowledgement,
          self_designations: merge_refs(doc.self_designation, self_designations.get(id)),
          offices: merge_refs(doc.office, offices.get(id)),
        });
      }

      let processed = records.len();
      let written = self.store.write_persons(records).await?;
      progress.batch(processed, written, &mut report);
    }
    Ok(report)
  }
}

/// Collapses the per-fact person rows into one row per person.
///
/// Names come from the first row. A person may carry at most one origination
/// fact, whatever region it resolves to. Several birth or death facts fold to
/// the lowest raw value, so the result does not depend on row order.
pub(crate) fn group_persons(rows: Vec<PersonRow>) -> Result<BTreeMap<i64, PersonRow>> {
  let mut persons: BTreeMap<i64, PersonRow> = BTreeMap::new();
  for row in rows {
    let Some(existing) = persons.get_mut(&row.id) else {
      persons.insert(row.id, row);
      continue;
    };
    match (existing.origination_fact, row.origination_fact) {
      (Some(a), Some(b)) if a != b => {
        return Err(dbbe_core::Error::MultipleOriginations(row.id).into());
      }
      (None, Some(_)) => {
        existing.origination_fact = row.origination_fact;
        existing.origination_region = row.origination_region;
      }
      _ => {}
    }
    existing.born = lowest(existing.born.take(), row.born);
    existing.died = lowest(existing.died.take(), row.died);
  }
  Ok(persons)
}

fn lowest(a: Option<String>, b: Option<String>) -> Option<String> {
  match (a, b) {
    (Some(a), Some(b)) => Some(a.min(b)),
    (a, b) => a.or(b),
  }
}

/// Resolves `(person, vocabulary id)` links to named references per person.
fn linked_names(names: Vec<NamedRow>, links: Vec<LinkRow>) -> HashMap<i64, Vec<NamedRef>> {
  let names: HashMap<i64, String> = names.into_iter().map(|n| (n.id, n.name)).collect();
  let mut out: HashMap<i64, Vec<NamedRef>> = HashMap::new();
  for link in links {
    out.entry(link.owner_id).or_default().push(NamedRef {
      id:   Some(link.member_id),
      name: names.get(&link.member_id).cloned(),
    });
  }
  out
}

/// Document references first, then relational ones the document lacks.
fn merge_refs(mut refs: Vec<NamedRef>, extra: Option<&Vec<NamedRef>>) -> Vec<NamedRef> {
  for r in extra.into_iter().flatten() {
    if !refs.iter().any(|existing| existing.id == r.id) {
      refs.push(r.clone());
    }
  }
  refs
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(id: i64, fact: Option<i64>, region: Option<i64>, born: Option<&str>) -> PersonRow {
    PersonRow {
      id,
      born: born.map(str::to_owned),
      origination_fact: fact,
      origination_region: region,
      ..PersonRow::default()
    }
  }

  fn is_multiple_originations(err: &Error, id: i64) -> bool {
    matches!(err, Error::Core(dbbe_core::Error::MultipleOriginations(p)) if *p == id)
  }

  #[test]
  fn repeated_rows_fold_into_one() {
    let persons = group_persons(vec![
      row(1, Some(50), Some(7), None),
      row(1, Some(50), Some(7), Some("(1100,1199)")),
      row(1, Some(50), Some(7), None),
      row(2, None, None, None),
    ])
    .unwrap();

    assert_eq!(persons.len(), 2);
    assert_eq!(persons[&1].origination_region, Some(7));
    assert_eq!(persons[&1].born.as_deref(), Some("(1100,1199)"));
    assert_eq!(persons[&2].origination_region, None);
  }

  #[test]
  fn conflicting_originations_are_fatal() {
    let err = group_persons(vec![row(3, Some(50), Some(7), None), row(3, Some(51), Some(8), None)])
      .unwrap_err();
    assert!(is_multiple_originations(&err, 3));
  }

  #[test]
  fn two_origination_facts_in_one_region_are_fatal() {
    let err = group_persons(vec![row(4, Some(50), Some(7), None), row(4, Some(51), Some(7), None)])
      .unwrap_err();
    assert!(is_multiple_originations(&err, 4));
  }

  #[test]
  fn an_origination_without_a_region_still_counts() {
    let err = group_persons(vec![row(5, Some(50), Some(7), None), row(5, Some(51), None, None)])
      .unwrap_err();
    assert!(is_multiple_originations(&err, 5));
  }

  #[test]
  fn birth_facts_fold_the_same_in_any_order() {
    let early = "[1100-01-01,1100-12-31]";
    let late = "[1150-01-01,1150-12-31]";
    let early_row = row(6, None, None, Some(early));
    let late_row = row(6, None, None, Some(late));
    let forward = group_persons(vec![early_row.clone(), late_row.clone()]).unwrap();
    let backward = group_persons(vec![late_row, early_row]).unwrap();

    assert_eq!(forward[&6].born.as_deref(), Some(early));
    assert_eq!(forward, backward);
  }

  #[test]
  fn relational_refs_fill_in_missing_ones() {
    let links = linked_names(
      vec![
        NamedRow {
          id:   1,
          name: "monk".into(),
        },
        NamedRow {
          id:   2,
          name: "scribe".into(),
        },
      ],
      vec![
        LinkRow {
          owner_id:  9,
          member_id: 1,
        },
        LinkRow {
          owner_id:  9,
          member_id: 2,
        },
      ],
    );
    let doc = vec![NamedRef {
      id:   Some(1),
      name: Some("monk".into()),
    }];

    let merged = merge_refs(doc, links.get(&9));
    let names: Vec<_> = merged.iter().filter_map(|r| r.name.as_deref()).collect();
    assert_eq!(names, ["monk", "scribe"]);
  }
}
