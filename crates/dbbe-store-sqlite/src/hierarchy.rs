//! Materialised hierarchy chains.

use rusqlite::Connection;

use dbbe_core::hierarchy::{HierarchyKind, HierarchyNode};

use crate::{Result, row};

/// Inserts a root-first chain and returns the id of its last (deepest) node.
///
/// Nodes are written insert-or-ignore, so a node shared by several chains is
/// stored once with whatever it looked like when first seen.
pub(crate) fn insert_chain(
  conn: &Connection,
  kind: HierarchyKind,
  chain: &[HierarchyNode],
) -> Result<Option<i64>> {
  let table = kind.table();
  for node in chain {
    match kind {
      HierarchyKind::Region => row::write(conn, table, &[
        ("id", &node.id),
        ("name", &node.name),
        ("historical_name", &node.alt_name),
        ("parent_id", &node.parent_id),
      ])?,
      HierarchyKind::Content => row::write(conn, table, &[
        ("id", &node.id),
        ("name", &node.name),
        ("parent_id", &node.parent_id),
      ])?,
    };
  }
  Ok(chain.last().map(|n| n.id))
}
