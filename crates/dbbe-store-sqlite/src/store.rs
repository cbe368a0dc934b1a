//! [`OutputStore`]: the SQLite file the export writes.

use std::{ops::AddAssign, path::Path, time::Duration};

use rusqlite::{Connection, types::Value};

use crate::{
  Error, Result, row,
  schema::{self, SchemaPart},
};

// ─── Options and reports ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
  /// How long a write waits for an external reader's lock.
  pub busy_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      busy_timeout: Duration::from_secs(60),
    }
  }
}

/// Outcome of one committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
  /// Primary rows written.
  pub written:       usize,
  /// Edges dropped because an endpoint was missing.
  pub skipped_edges: usize,
}

impl AddAssign for BatchReport {
  fn add_assign(&mut self, other: Self) {
    self.written += other.written;
    self.skipped_edges += other.skipped_edges;
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The output store, a single SQLite file with one writer.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct OutputStore {
  conn: tokio_rusqlite::Connection,
}

impl OutputStore {
  /// Opens (or creates) the store at `path`, creating its parent directory,
  /// and initialises the schema.
  pub async fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|source| Error::Io {
          path: parent.display().to_string(),
          source,
        })?;
    }

    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.configure(options).await?;
    store.init_schema().await?;
    Ok(store)
  }

  /// Opens an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.configure(StoreOptions::default()).await?;
    store.init_schema().await?;
    Ok(store)
  }

  async fn configure(&self, options: StoreOptions) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(
          "PRAGMA journal_mode = WAL;
           PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Creates every table of every part. Safe to run against any prior state.
  pub async fn init_schema(&self) -> Result<()> {
    for part in SchemaPart::all() {
      self.ensure_schema(part).await?;
    }
    Ok(())
  }

  /// Creates the tables of one part and adds any columns they are missing.
  pub async fn ensure_schema(&self, part: SchemaPart) -> Result<()> {
    self
      .transaction(move |conn| {
        for table in part.tables() {
          row::ensure_table(conn, &table)?;
        }
        Ok(())
      })
      .await
  }

  /// Toggles foreign-key enforcement. Must not be called mid-transaction.
  pub async fn set_foreign_keys(&self, enabled: bool) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.pragma_update(None, "foreign_keys", enabled)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Runs `f` in one transaction, committing only if it succeeds.
  pub(crate) async fn transaction<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match f(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(err) => Ok(Err(err)),
        }
      })
      .await?
  }

  /// Folds the write-ahead log into the main file so the store is a single
  /// self-contained file, then refreshes query statistics.
  pub async fn checkpoint(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(
          "PRAGMA wal_checkpoint(TRUNCATE);
           PRAGMA optimize;",
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Inspection ────────────────────────────────────────────────────────────

  pub async fn count(&self, table: &str) -> Result<i64> {
    schema::table(table)?;
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let n = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(n)
  }

  /// Column names currently present on `table`.
  pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
    schema::table(table)?;
    let table = table.to_owned();
    let cols = self
      .conn
      .call(move |conn| Ok(row::columns(conn, &table)?))
      .await?;
    Ok(cols)
  }

  /// Every row of `table`, ordered by all columns.
  pub async fn snapshot(&self, table: &str) -> Result<Vec<Vec<Value>>> {
    let columns = self.columns(table).await?;
    let order: Vec<String> = (1..=columns.len()).map(|i| i.to_string()).collect();
    let sql = format!("SELECT * FROM {table} ORDER BY {}", order.join(", "));
    let width = columns.len();

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |r| (0..width).map(|i| r.get::<_, Value>(i)).collect())?
          .collect::<rusqlite::Result<Vec<Vec<Value>>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}
