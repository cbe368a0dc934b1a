//! Id-to-kind resolution with a deterministic tie-break.

use std::collections::{HashMap, hash_map::Entry};

/// An id claimed by two kinds; the lower-ordered kind was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindConflict<K> {
  pub id:      i64,
  pub kept:    K,
  pub dropped: K,
}

/// Maps ids to a single kind. When the same id is reported under several
/// kinds, the one that sorts first wins and the clash is recorded.
#[derive(Debug, Clone)]
pub struct KindIndex<K> {
  kinds:     HashMap<i64, K>,
  conflicts: Vec<KindConflict<K>>,
}

impl<K: Copy + Ord> KindIndex<K> {
  pub fn build(rows: impl IntoIterator<Item = (i64, K)>) -> Self {
    let mut kinds = HashMap::new();
    let mut conflicts = Vec::new();

    for (id, kind) in rows {
      match kinds.entry(id) {
        Entry::Vacant(slot) => {
          slot.insert(kind);
        }
        Entry::Occupied(mut slot) => {
          let current = *slot.get();
          if current == kind {
            continue;
          }
          let (kept, dropped) = if kind < current { (kind, current) } else { (current, kind) };
          slot.insert(kept);
          conflicts.push(KindConflict { id, kept, dropped });
        }
      }
    }

    Self { kinds, conflicts }
  }

  pub fn get(&self, id: i64) -> Option<K> { self.kinds.get(&id).copied() }

  pub fn conflicts(&self) -> &[KindConflict<K>] { &self.conflicts }

  pub fn len(&self) -> usize { self.kinds.len() }

  pub fn is_empty(&self) -> bool { self.kinds.is_empty() }

  pub fn ids_of(&self, kind: K) -> impl Iterator<Item = i64> + '_ {
    self
      .kinds
      .iter()
      .filter(move |(_, k)| **k == kind)
      .map(|(id, _)| *id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::EntityKind;

  #[test]
  fn lower_kind_wins_regardless_of_order() {
    let index = KindIndex::build([
      (7, EntityKind::Person),
      (7, EntityKind::Manuscript),
      (8, EntityKind::Type),
      (8, EntityKind::Type),
    ]);
    assert_eq!(index.get(7), Some(EntityKind::Manuscript));
    assert_eq!(index.get(8), Some(EntityKind::Type));
    assert_eq!(index.conflicts(), &[KindConflict {
      id:      7,
      kept:    EntityKind::Manuscript,
      dropped: EntityKind::Person,
    }]);
  }

  #[test]
  fn unknown_ids_resolve_to_none() {
    let index = KindIndex::build([(1, EntityKind::Occurrence)]);
    assert_eq!(index.get(2), None);
    assert_eq!(index.ids_of(EntityKind::Occurrence).collect::<Vec<_>>(), [1]);
  }
}
