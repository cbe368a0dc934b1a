//! Materialises hierarchy chains from the relational source.

use std::collections::HashMap;

use dbbe_core::{
  hierarchy::{HierarchyKind, select_leaves, walk_chain},
  record::Chain,
  source::RelationalSource,
};
use tracing::debug;

use crate::{Error, Result};

/// Walks and caches parent chains for the duration of one run.
///
/// Many manuscripts share a library region and many persons share an
/// origination; each chain is read from the source once.
#[derive(Debug)]
pub struct HierarchyWalker {
  max_depth: usize,
  chains:    HashMap<(HierarchyKind, i64), Chain>,
}

impl HierarchyWalker {
  pub fn new(max_depth: usize) -> Self {
    Self {
      max_depth,
      chains: HashMap::new(),
    }
  }

  /// The chain from the root down to `leaf`, empty if `leaf` is unknown.
  pub async fn chain<R: RelationalSource>(
    &mut self,
    source: &R,
    hierarchy: HierarchyKind,
    leaf: i64,
  ) -> Result<Chain> {
    if let Some(chain) = self.chains.get(&(hierarchy, leaf)) {
      return Ok(chain.clone());
    }

    let chain = walk_chain(hierarchy, leaf, self.max_depth, |id| async move {
      source
        .hierarchy_node(hierarchy, id)
        .await
        .map_err(Error::upstream)
    })
    .await?;

    debug!(%hierarchy, leaf, depth = chain.len(), "walked hierarchy chain");
    self.chains.insert((hierarchy, leaf), chain.clone());
    Ok(chain)
  }

  pub async fn chain_opt<R: RelationalSource>(
    &mut self,
    source: &R,
    hierarchy: HierarchyKind,
    leaf: Option<i64>,
  ) -> Result<Chain> {
    match leaf {
      Some(leaf) => self.chain(source, hierarchy, leaf).await,
      None => Ok(Chain::new()),
    }
  }

  /// Chains for the leaf content nodes among `candidates`.
  pub async fn content_leaves<R: RelationalSource>(
    &mut self,
    source: &R,
    candidates: &[i64],
  ) -> Result<Vec<Chain>> {
    if candidates.is_empty() {
      return Ok(Vec::new());
    }
    let parents = source
      .content_parents(candidates)
      .await
      .map_err(Error::upstream)?;

    let mut chains = Vec::new();
    for leaf in select_leaves(candidates, &parents) {
      let chain = self.chain(source, HierarchyKind::Content, leaf).await?;
      if !chain.is_empty() {
        chains.push(chain);
      }
    }
    Ok(chains)
  }

  pub fn cached(&self) -> usize { self.chains.len() }
}
