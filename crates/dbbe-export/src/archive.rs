//! Pushing finished snapshots to the archival repository.

use std::path::{Path, PathBuf};

use dbbe_zenodo::{PublishMode, Publisher, ZenodoClient};
use tracing::info;

use crate::{Error, Result, Settings};

/// Every `*.sqlite` file in the directory holding `output_path`, sorted by
/// name.
pub fn snapshot_files(output_path: &Path) -> Result<Vec<PathBuf>> {
  let dir = match output_path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() => dir,
    _ => Path::new("."),
  };
  let io_err = |source| Error::Io {
    path: dir.display().to_string(),
    source,
  };

  let mut files = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(io_err)? {
    let path = entry.map_err(io_err)?.path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == "sqlite") {
      files.push(path);
    }
  }
  if files.is_empty() {
    return Err(Error::NoSnapshot(dir.display().to_string()));
  }
  files.sort();
  Ok(files)
}

/// Uploads `files` (or the snapshots next to the configured output) and
/// returns the deposition id.
pub async fn publish_snapshot(
  settings: &Settings,
  files: Vec<PathBuf>,
  mode: PublishMode,
  deposition_id: Option<u64>,
) -> Result<u64> {
  let token = settings
    .zenodo
    .token
    .as_deref()
    .filter(|t| !t.trim().is_empty())
    .ok_or(Error::MissingToken)?;

  let files = if files.is_empty() {
    snapshot_files(&settings.output_path)?
  } else {
    files
  };
  info!(%mode, files = files.len(), api = %settings.zenodo.api_url, "publishing snapshot");

  let client = ZenodoClient::new(&settings.zenodo.api_url, token)?;
  let publisher = Publisher::new(client, settings.deposition_metadata());
  Ok(publisher.publish(&files, mode, deposition_id).await?)
}
