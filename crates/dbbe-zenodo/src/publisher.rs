//! The create / new-version / upload / publish sequence.

use std::path::{Path, PathBuf};

use strum::{Display, EnumString};
use tracing::{info, warn};

use crate::{
  Error, Result,
  api::{Deposition, DepositionApi, Metadata},
};

/// What to do with the deposition once the files are uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PublishMode {
  /// Always start a fresh deposition and leave it as a draft.
  Create,
  /// Upload into the existing deposition (or a new version of it) and leave
  /// the result as a draft.
  Update,
  /// As `Update`, then finalise the deposition.
  Publish,
}

/// Pushes snapshot files to a deposition.
pub struct Publisher<A> {
  api:      A,
  metadata: Metadata,
}

impl<A: DepositionApi> Publisher<A> {
  pub fn new(api: A, metadata: Metadata) -> Self { Self { api, metadata } }

  pub fn api(&self) -> &A { &self.api }

  /// Uploads `files` and returns the id of the deposition holding them.
  ///
  /// Outside [`PublishMode::Create`] the target is `existing` if given,
  /// otherwise the first deposition titled like the configured metadata; a
  /// new deposition is created when neither exists. A finalised target is
  /// first opened as a new version. Files whose names collide with the
  /// upload are removed before uploading.
  pub async fn publish(
    &self,
    files: &[PathBuf],
    mode: PublishMode,
    existing: Option<u64>,
  ) -> Result<u64> {
    if files.is_empty() {
      return Err(Error::NoFiles);
    }

    let target = match mode {
      PublishMode::Create => None,
      PublishMode::Update | PublishMode::Publish => self.find_target(existing).await?,
    };

    let id = match target {
      Some(dep) if dep.submitted => self.open_new_version(dep.id).await?,
      Some(dep) => {
        info!(deposition = dep.id, "updating draft deposition");
        dep.id
      }
      None => {
        let dep = self.api.create_deposition(&self.metadata).await?;
        info!(deposition = dep.id, title = %self.metadata.title, "created deposition");
        dep.id
      }
    };

    let current = self
      .api
      .get_deposition(id)
      .await?
      .ok_or(Error::DepositionNotFound(id))?;

    for path in files {
      self.replace_file(&current, path).await?;
    }

    if mode == PublishMode::Publish {
      self.api.publish(id).await?;
      info!(deposition = id, "deposition published");
    } else {
      info!(deposition = id, "deposition left as draft");
    }
    Ok(id)
  }

  async fn find_target(&self, existing: Option<u64>) -> Result<Option<Deposition>> {
    if let Some(id) = existing {
      let dep = self
        .api
        .get_deposition(id)
        .await?
        .ok_or(Error::DepositionNotFound(id))?;
      return Ok(Some(dep));
    }

    let found = self
      .api
      .list_depositions()
      .await?
      .into_iter()
      .find(|d| d.metadata.title == self.metadata.title);
    if let Some(dep) = &found {
      info!(deposition = dep.id, title = %self.metadata.title, "found existing deposition");
    }
    Ok(found)
  }

  async fn open_new_version(&self, id: u64) -> Result<u64> {
    let response = self.api.create_new_version(id).await?;
    let draft = response.latest_draft_id().ok_or(Error::MissingDraftLink(id))?;
    self.api.update_metadata(draft, &self.metadata).await?;
    info!(deposition = id, draft, "opened new version");
    Ok(draft)
  }

  async fn replace_file(&self, deposition: &Deposition, path: &Path) -> Result<()> {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string());

    let bytes = tokio::fs::read(path).await.map_err(|source| Error::Io {
      path: path.to_owned(),
      source,
    })?;

    if let Some(old) = deposition.file_named(&name) {
      warn!(deposition = deposition.id, file = %name, "replacing existing file");
      self.api.delete_file(deposition.id, &old.id).await?;
    }

    let size = bytes.len();
    self.api.upload_file(deposition.id, &name, bytes).await?;
    info!(deposition = deposition.id, file = %name, bytes = size, "uploaded file");
    Ok(())
  }
}
