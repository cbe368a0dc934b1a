//! Archival publication of export snapshots to a Zenodo-style deposition API.
//!
//! [`DepositionApi`] is the REST surface; [`ZenodoClient`] implements it over
//! HTTP. [`Publisher`] drives the create / new-version / upload / publish
//! sequence on top of any implementation.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod api;
pub mod client;
pub mod error;
pub mod publisher;

pub use api::{Creator, Deposition, DepositionApi, DepositionFile, Metadata};
pub use client::ZenodoClient;
pub use error::{Error, Result};
pub use publisher::{PublishMode, Publisher};

#[cfg(test)]
mod tests;
