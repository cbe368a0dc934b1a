//! The DBBE export pipeline.
//!
//! [`Pipeline`] reads the document store and the relational source through
//! the traits in [`dbbe_core::source`] and writes an [`OutputStore`] step by
//! step in a fixed order. [`archive`] pushes the finished file to a
//! deposition service.
//!
//! [`OutputStore`]: dbbe_store_sqlite::OutputStore

pub mod archive;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod linker;
mod migrate;
pub mod pipeline;
pub mod step;

pub use config::Settings;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOptions};
pub use step::{RunReport, Step, StepReport};
