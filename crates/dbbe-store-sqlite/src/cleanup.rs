//! Drops optional join-table columns that no row uses.

use rusqlite::Connection;

use crate::{
  OutputStore, Result, row,
  schema::{self, TableDef},
};

/// A column removed by [`OutputStore::prune_empty_columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedColumn {
  pub table:  String,
  pub column: String,
}

impl OutputStore {
  /// Rebuilds every table with prunable columns that are NULL in all rows,
  /// without those columns. Key columns and all remaining values are copied
  /// unchanged. Run only after the affected tables are fully written.
  pub async fn prune_empty_columns(&self) -> Result<Vec<PrunedColumn>> {
    let mut tables: Vec<&'static TableDef> = schema::prunable_tables().collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));

    let mut pruned = Vec::new();
    for def in tables {
      let dropped = self.transaction(move |conn| prune_table(conn, def)).await?;
      for column in dropped {
        tracing::info!(table = %def.name, %column, "dropped empty column");
        pruned.push(PrunedColumn {
          table: def.name.clone(),
          column,
        });
      }
    }
    Ok(pruned)
  }
}

fn prune_table(conn: &Connection, def: &TableDef) -> Result<Vec<String>> {
  let present = row::columns(conn, &def.name)?;

  let mut empty = Vec::new();
  for column in def.columns.iter().filter(|c| c.prunable) {
    if !present.contains(&column.name) {
      continue;
    }
    let used: bool = conn.query_row(
      &format!("SELECT EXISTS (SELECT 1 FROM {} WHERE {} IS NOT NULL)", def.name, column.name),
      [],
      |r| r.get(0),
    )?;
    if !used {
      empty.push(column.name.clone());
    }
  }
  if empty.is_empty() {
    return Ok(empty);
  }

  let keep = |name: &String| present.contains(name) && !empty.contains(name);
  let kept: Vec<&str> = def
    .columns
    .iter()
    .filter(|c| keep(&c.name))
    .map(|c| c.name.as_str())
    .collect();
  let tmp = format!("{}_tmp", def.name);
  let cols = kept.join(", ");

  conn.execute_batch(&format!("DROP TABLE IF EXISTS {tmp}"))?;
  conn.execute_batch(&def.create_sql_as(&tmp, |c| keep(&c.name)))?;
  conn.execute_batch(&format!(
    "INSERT INTO {tmp} ({cols}) SELECT {cols} FROM {name};
     DROP TABLE {name};
     ALTER TABLE {tmp} RENAME TO {name};",
    name = def.name
  ))?;
  Ok(empty)
}
