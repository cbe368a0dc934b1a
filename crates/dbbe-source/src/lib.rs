//! Readers for the two upstream DBBE systems.
//!
//! [`PgSource`] implements [`dbbe_core::source::RelationalSource`] over a
//! PostgreSQL pool. [`ElasticClient`] implements
//! [`dbbe_core::source::DocumentStore`] over the Elasticsearch REST API.
//! Neither writes to its upstream.

pub mod elastic;
pub mod error;
pub mod pg;

pub use elastic::{ElasticClient, ElasticConfig};
pub use error::{Error, Result};
pub use pg::PgSource;

#[cfg(test)]
mod tests;
