//! Core types and trait definitions for the DBBE export.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! describes the vocabulary shared by the sources, the output store and the
//! migration pipeline, and the two source traits the pipeline reads through.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod biblio;
pub mod document;
pub mod entity;
pub mod error;
pub mod fuzzy_date;
pub mod hierarchy;
pub mod index;
pub mod record;
pub mod role;
pub mod source;

pub use error::{Error, Result};
