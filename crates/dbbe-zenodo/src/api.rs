//! Deposition resources and the REST contract over them.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Resources ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
  pub name:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub affiliation: Option<String>,
}

/// Descriptive metadata of a deposition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
  #[serde(default)]
  pub title:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub upload_type:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description:  Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub creators:     Vec<Creator>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub access_right: Option<String>,
}

impl Metadata {
  /// Metadata for a dataset deposition.
  pub fn dataset(
    title: impl Into<String>,
    description: impl Into<String>,
    creators: Vec<Creator>,
    access_right: impl Into<String>,
  ) -> Self {
    Self {
      title: title.into(),
      upload_type: Some("dataset".to_owned()),
      description: Some(description.into()),
      creators,
      access_right: Some(access_right.into()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositionFile {
  pub id:       String,
  pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub latest_draft: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposition {
  pub id:        u64,
  /// `true` once the deposition has been published; it can no longer take
  /// files and needs a new version instead.
  #[serde(default)]
  pub submitted: bool,
  #[serde(default)]
  pub metadata:  Metadata,
  #[serde(default)]
  pub files:     Vec<DepositionFile>,
  #[serde(default)]
  pub links:     Links,
}

impl Deposition {
  /// The id of the draft a new-version request opened, taken from the last
  /// path segment of `links.latest_draft`.
  pub fn latest_draft_id(&self) -> Option<u64> {
    self
      .links
      .latest_draft
      .as_deref()?
      .trim_end_matches('/')
      .rsplit('/')
      .next()?
      .parse()
      .ok()
  }

  pub fn file_named(&self, name: &str) -> Option<&DepositionFile> {
    self.files.iter().find(|f| f.filename == name)
  }
}

// ─── Contract ────────────────────────────────────────────────────────────────

/// The deposition REST surface. Every non-2xx response is an error.
pub trait DepositionApi: Send + Sync {
  fn list_depositions(&self) -> impl Future<Output = Result<Vec<Deposition>, Error>> + Send + '_;

  fn create_deposition<'a>(
    &'a self,
    metadata: &'a Metadata,
  ) -> impl Future<Output = Result<Deposition, Error>> + Send + 'a;

  /// `None` when the service does not know the id.
  fn get_deposition(
    &self,
    id: u64,
  ) -> impl Future<Output = Result<Option<Deposition>, Error>> + Send + '_;

  /// Opens a mutable draft of a published deposition. The returned
  /// deposition links to the draft via `links.latest_draft`.
  fn create_new_version(
    &self,
    id: u64,
  ) -> impl Future<Output = Result<Deposition, Error>> + Send + '_;

  fn update_metadata<'a>(
    &'a self,
    id: u64,
    metadata: &'a Metadata,
  ) -> impl Future<Output = Result<Deposition, Error>> + Send + 'a;

  fn delete_file<'a>(
    &'a self,
    id: u64,
    file_id: &'a str,
  ) -> impl Future<Output = Result<(), Error>> + Send + 'a;

  /// Uploads one file in a single request.
  fn upload_file<'a>(
    &'a self,
    id: u64,
    name: &'a str,
    bytes: Vec<u8>,
  ) -> impl Future<Output = Result<DepositionFile, Error>> + Send + 'a;

  /// Finalises a deposition. Irreversible on the remote service.
  fn publish(&self, id: u64) -> impl Future<Output = Result<Deposition, Error>> + Send + '_;
}
