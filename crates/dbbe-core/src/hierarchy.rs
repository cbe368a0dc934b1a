//! Parent-pointer hierarchies (regions and the content taxonomy).

use std::{collections::HashSet, future::Future};

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::Error;

/// The two hierarchies the export walks.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum HierarchyKind {
  /// Geographic regions, stored in the `location` table.
  Region,
  /// Manuscript content genres, stored in the `content` table.
  Content,
}

impl HierarchyKind {
  pub fn table(self) -> &'static str {
    match self {
      Self::Region => "location",
      Self::Content => "content",
    }
  }
}

/// One node of a hierarchy as read from the relational source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
  pub id:        i64,
  pub name:      Option<String>,
  pub alt_name:  Option<String>,
  pub parent_id: Option<i64>,
}

/// Walks parent pointers upward from `leaf` and returns the chain root-first.
///
/// `fetch` resolves a node id; `Ok(None)` means the node is absent. An absent
/// leaf yields an empty chain, while an absent ancestor truncates the chain
/// and clears the dangling parent pointer of the last node found. Revisiting a
/// node or exceeding `max_depth` is an error.
pub async fn walk_chain<F, Fut, E>(
  hierarchy: HierarchyKind,
  leaf: i64,
  max_depth: usize,
  mut fetch: F,
) -> Result<Vec<HierarchyNode>, E>
where
  F: FnMut(i64) -> Fut,
  Fut: Future<Output = Result<Option<HierarchyNode>, E>>,
  E: From<Error>,
{
  let mut chain: Vec<HierarchyNode> = Vec::new();
  let mut visited = HashSet::new();
  let mut next = Some(leaf);

  while let Some(id) = next {
    if !visited.insert(id) {
      return Err(Error::HierarchyCycle { hierarchy, node: id }.into());
    }
    if chain.len() >= max_depth {
      return Err(
        Error::HierarchyTooDeep {
          hierarchy,
          leaf,
          max: max_depth,
        }
        .into(),
      );
    }

    match fetch(id).await? {
      Some(node) => {
        next = node.parent_id;
        chain.push(node);
      }
      None => {
        if let Some(last) = chain.last_mut() {
          tracing::warn!(
            %hierarchy,
            node = last.id,
            missing_parent = id,
            "hierarchy parent is missing; truncating chain"
          );
          last.parent_id = None;
        }
        next = None;
      }
    }
  }

  chain.reverse();
  Ok(chain)
}

/// Keeps the candidates that are not the parent of another candidate.
///
/// `parents` maps candidate ids to their parent ids. The result preserves the
/// candidates' order and drops duplicates.
pub fn select_leaves(candidates: &[i64], parents: &[(i64, Option<i64>)]) -> Vec<i64> {
  let wanted: HashSet<i64> = candidates.iter().copied().collect();
  let inner: HashSet<i64> = parents
    .iter()
    .filter(|(id, _)| wanted.contains(id))
    .filter_map(|(_, parent)| *parent)
    .collect();

  let mut seen = HashSet::new();
  candidates
    .iter()
    .copied()
    .filter(|id| !inner.contains(id) && seen.insert(*id))
    .collect()
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn node(id: i64, parent: Option<i64>) -> HierarchyNode {
    HierarchyNode {
      id,
      name: Some(format!("n{id}")),
      alt_name: None,
      parent_id: parent,
    }
  }

  async fn walk(
    nodes: &HashMap<i64, HierarchyNode>,
    leaf: i64,
    max: usize,
  ) -> Result<Vec<HierarchyNode>, Error> {
    walk_chain(HierarchyKind::Region, leaf, max, |id| {
      let found = nodes.get(&id).cloned();
      async move { Ok::<_, Error>(found) }
    })
    .await
  }

  fn tree(nodes: &[(i64, Option<i64>)]) -> HashMap<i64, HierarchyNode> {
    nodes.iter().map(|&(id, p)| (id, node(id, p))).collect()
  }

  #[tokio::test]
  async fn chain_is_root_first() {
    let nodes = tree(&[(1, None), (2, Some(1)), (3, Some(2))]);
    let chain = walk(&nodes, 3, 8).await.unwrap();
    let ids: Vec<_> = chain.iter().map(|n| n.id).collect();
    assert_eq!(ids, [1, 2, 3]);
  }

  #[tokio::test]
  async fn missing_leaf_is_empty() {
    let nodes = tree(&[(1, None)]);
    assert!(walk(&nodes, 9, 8).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn missing_parent_truncates() {
    let nodes = tree(&[(2, Some(1)), (3, Some(2))]);
    let chain = walk(&nodes, 3, 8).await.unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].id, 2);
    assert_eq!(chain[0].parent_id, None);
  }

  #[tokio::test]
  async fn cycle_is_rejected() {
    let nodes = tree(&[(1, Some(3)), (2, Some(1)), (3, Some(2))]);
    let err = walk(&nodes, 3, 8).await.unwrap_err();
    assert!(matches!(err, Error::HierarchyCycle { node: 3, .. }));
  }

  #[tokio::test]
  async fn depth_is_bounded() {
    let nodes = tree(&[(1, None), (2, Some(1)), (3, Some(2))]);
    let err = walk(&nodes, 3, 2).await.unwrap_err();
    assert!(matches!(err, Error::HierarchyTooDeep { leaf: 3, max: 2, .. }));
  }

  #[test]
  fn leaves_exclude_candidate_ancestors() {
    // Poetry(10) > Epigram(11); both assigned, only Epigram survives.
    let leaves = select_leaves(&[10, 11, 20, 11], &[
      (10, None),
      (11, Some(10)),
      (20, Some(5)),
    ]);
    assert_eq!(leaves, [11, 20]);
  }
}
