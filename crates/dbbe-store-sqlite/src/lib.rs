//! SQLite output store for the DBBE export.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every batch writer runs inside a single
//! transaction; a failure rolls back that batch only.

mod bibliography;
mod cleanup;
mod hierarchy;
mod lookup;
mod manuscript;
mod occurrence;
mod person;
mod poem_type;
mod row;
mod schema;
mod store;
mod verse;

pub mod error;

pub use error::{Error, Result};
pub use cleanup::PrunedColumn;
pub use lookup::LookupKind;
pub use schema::{SchemaPart, TableRole, WriteMode};
pub use store::{BatchReport, OutputStore, StoreOptions};

#[cfg(test)]
mod tests;
