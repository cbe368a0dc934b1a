//! Row-level helpers shared by the batch writers.
//!
//! Writers never format their own `INSERT` statements; they name a table and
//! its columns and the table's declared [`WriteMode`](crate::WriteMode)
//! decides between upsert and insert-or-ignore.

use rusqlite::{Connection, OptionalExtension as _, ToSql};

use crate::{
  Error, Result,
  schema::{self, TableDef},
};

/// Writes one row into `table`. Returns the number of rows changed, which is
/// zero when an insert-or-ignore hit an existing key.
pub(crate) fn write(
  conn: &Connection,
  table: &str,
  values: &[(&str, &dyn ToSql)],
) -> Result<usize> {
  let def = schema::table(table)?;
  let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
  let params: Vec<&dyn ToSql> = values.iter().map(|(_, v)| *v).collect();

  let mut stmt = conn.prepare_cached(&def.insert_sql(&columns))?;
  Ok(stmt.execute(params.as_slice())?)
}

/// Ensures an id-only row exists so later foreign keys can point at it. An
/// existing row is left untouched.
pub(crate) fn stub(conn: &Connection, table: &str, id: i64) -> Result<bool> {
  schema::table(table)?;
  let mut stmt = conn.prepare_cached(&format!("INSERT OR IGNORE INTO {table} (id) VALUES (?1)"))?;
  Ok(stmt.execute([id])? > 0)
}

pub(crate) fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
  schema::table(table)?;
  let mut stmt = conn.prepare_cached(&format!("SELECT 1 FROM {table} WHERE id = ?1"))?;
  Ok(stmt.query_row([id], |_| Ok(())).optional()?.is_some())
}

/// Column names currently present on `table`.
pub(crate) fn columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let names = stmt.query_map([], |r| r.get::<_, String>(1))?;
  names.collect()
}

/// Creates `def` if missing and adds any declared column the existing table
/// lacks. Never drops or retypes anything.
pub(crate) fn ensure_table(conn: &Connection, def: &TableDef) -> Result<()> {
  let schema_err = |source| Error::Schema {
    table: def.name.clone(),
    source,
  };

  conn.execute_batch(&def.create_sql()).map_err(schema_err)?;

  let present = columns(conn, &def.name).map_err(schema_err)?;
  for column in &def.columns {
    if present.iter().any(|p| p == &column.name) {
      continue;
    }
    tracing::info!(table = %def.name, column = %column.name, "adding missing column");
    conn
      .execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        def.name, column.name, column.decl
      ))
      .map_err(schema_err)?;
  }
  Ok(())
}
