use std::{
  path::PathBuf,
  sync::{Mutex, MutexGuard},
};

use tempfile::TempDir;

use crate::{
  Error, Result,
  api::{Deposition, DepositionApi, DepositionFile, Links, Metadata},
  publisher::{PublishMode, Publisher},
};

// ─── Fake API ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct State {
  depositions: Vec<Deposition>,
  next_id:     u64,
  calls:       Vec<String>,
  fail_upload: bool,
}

#[derive(Default)]
struct FakeApi {
  state: Mutex<State>,
}

impl FakeApi {
  fn with(depositions: Vec<Deposition>) -> Self {
    let next_id = depositions.iter().map(|d| d.id).max().unwrap_or(0) + 1;
    Self {
      state: Mutex::new(State {
        depositions,
        next_id,
        ..State::default()
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap() }

  fn calls(&self) -> Vec<String> { self.lock().calls.clone() }

  fn deposition(&self, id: u64) -> Deposition {
    self.lock().depositions.iter().find(|d| d.id == id).cloned().unwrap()
  }
}

impl DepositionApi for FakeApi {
  async fn list_depositions(&self) -> Result<Vec<Deposition>> {
    let mut s = self.lock();
    s.calls.push("list".into());
    Ok(s.depositions.clone())
  }

  async fn create_deposition<'a>(&'a self, metadata: &'a Metadata) -> Result<Deposition> {
    let mut s = self.lock();
    let id = s.next_id;
    s.next_id += 1;
    s.calls.push(format!("create {id}"));
    let dep = Deposition {
      id,
      submitted: false,
      metadata: metadata.clone(),
      files: Vec::new(),
      links: Links::default(),
    };
    s.depositions.push(dep.clone());
    Ok(dep)
  }

  async fn get_deposition(&self, id: u64) -> Result<Option<Deposition>> {
    let s = self.lock();
    Ok(s.depositions.iter().find(|d| d.id == id).cloned())
  }

  async fn create_new_version(&self, id: u64) -> Result<Deposition> {
    let mut s = self.lock();
    let draft_id = s.next_id;
    s.next_id += 1;
    s.calls.push(format!("new_version {id}"));
    let source = s.depositions.iter().find(|d| d.id == id).cloned().unwrap();
    s.depositions.push(Deposition {
      id: draft_id,
      submitted: false,
      ..source.clone()
    });
    Ok(Deposition {
      links: Links {
        latest_draft: Some(format!("https://zenodo.test/api/deposit/depositions/{draft_id}")),
      },
      ..source
    })
  }

  async fn update_metadata<'a>(&'a self, id: u64, metadata: &'a Metadata) -> Result<Deposition> {
    let mut s = self.lock();
    s.calls.push(format!("update_metadata {id}"));
    let dep = s.depositions.iter_mut().find(|d| d.id == id).unwrap();
    dep.metadata = metadata.clone();
    Ok(dep.clone())
  }

  async fn delete_file<'a>(&'a self, id: u64, file_id: &'a str) -> Result<()> {
    let mut s = self.lock();
    s.calls.push(format!("delete {id} {file_id}"));
    let dep = s.depositions.iter_mut().find(|d| d.id == id).unwrap();
    dep.files.retain(|f| f.id != file_id);
    Ok(())
  }

  async fn upload_file<'a>(
    &'a self,
    id: u64,
    name: &'a str,
    bytes: Vec<u8>,
  ) -> Result<DepositionFile> {
    let mut s = self.lock();
    if s.fail_upload {
      return Err(Error::Status {
        method: "POST",
        path:   format!("{id}/files"),
        status: 500,
        body:   "boom".into(),
      });
    }
    s.calls.push(format!("upload {id} {name} {}", bytes.len()));
    let file = DepositionFile {
      id:       format!("{name}-{id}"),
      filename: name.to_owned(),
    };
    let dep = s.depositions.iter_mut().find(|d| d.id == id).unwrap();
    dep.files.push(file.clone());
    Ok(file)
  }

  async fn publish(&self, id: u64) -> Result<Deposition> {
    let mut s = self.lock();
    s.calls.push(format!("publish {id}"));
    let dep = s.depositions.iter_mut().find(|d| d.id == id).unwrap();
    dep.submitted = true;
    Ok(dep.clone())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

const TITLE: &str = "DBBE SQLite Backup";

fn metadata() -> Metadata {
  Metadata::dataset(TITLE, "Automated SQLite backup", Vec::new(), "restricted")
}

fn existing(id: u64, submitted: bool, files: &[(&str, &str)]) -> Deposition {
  Deposition {
    id,
    submitted,
    metadata: Metadata {
      title: TITLE.into(),
      ..Metadata::default()
    },
    files: files
      .iter()
      .map(|(id, name)| DepositionFile {
        id:       id.to_string(),
        filename: name.to_string(),
      })
      .collect(),
    links: Links::default(),
  }
}

fn snapshot() -> (TempDir, Vec<PathBuf>) {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("export_data.sqlite");
  std::fs::write(&path, b"SQLite format 3\0").unwrap();
  (dir, vec![path])
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_without_match_creates_a_draft() {
  let (_dir, files) = snapshot();
  let publisher = Publisher::new(FakeApi::default(), metadata());

  let id = publisher.publish(&files, PublishMode::Update, None).await.unwrap();

  assert_eq!(id, 1);
  assert_eq!(
    publisher.api().calls(),
    vec!["list", "create 1", "upload 1 export_data.sqlite 16"]
  );
  assert!(!publisher.api().deposition(1).submitted);
}

#[tokio::test]
async fn finalised_deposition_gets_a_new_version() {
  let (_dir, files) = snapshot();
  let api = FakeApi::with(vec![existing(10, true, &[("f1", "export_data.sqlite")])]);
  let publisher = Publisher::new(api, metadata());

  let id = publisher.publish(&files, PublishMode::Publish, None).await.unwrap();

  assert_eq!(id, 11);
  assert_eq!(
    publisher.api().calls(),
    vec![
      "list",
      "new_version 10",
      "update_metadata 11",
      "delete 11 f1",
      "upload 11 export_data.sqlite 16",
      "publish 11",
    ]
  );
  let draft = publisher.api().deposition(11);
  assert_eq!(draft.files.len(), 1);
  assert!(draft.submitted);
  // The published original is untouched.
  assert_eq!(publisher.api().deposition(10).files[0].id, "f1");
}

#[tokio::test]
async fn draft_deposition_is_updated_in_place() {
  let (_dir, files) = snapshot();
  let api = FakeApi::with(vec![existing(4, false, &[("other", "notes.txt")])]);
  let publisher = Publisher::new(api, metadata());

  let id = publisher.publish(&files, PublishMode::Update, Some(4)).await.unwrap();

  assert_eq!(id, 4);
  assert_eq!(publisher.api().calls(), vec!["upload 4 export_data.sqlite 16"]);
  assert_eq!(publisher.api().deposition(4).files.len(), 2);
}

#[tokio::test]
async fn create_mode_ignores_existing_depositions() {
  let (_dir, files) = snapshot();
  let api = FakeApi::with(vec![existing(3, false, &[])]);
  let publisher = Publisher::new(api, metadata());

  let id = publisher.publish(&files, PublishMode::Create, None).await.unwrap();

  assert_eq!(id, 4);
  assert!(!publisher.api().calls().contains(&"list".to_string()));
}

#[tokio::test]
async fn unknown_deposition_id_is_an_error() {
  let (_dir, files) = snapshot();
  let publisher = Publisher::new(FakeApi::default(), metadata());

  let err = publisher
    .publish(&files, PublishMode::Update, Some(99))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DepositionNotFound(99)));
}

#[tokio::test]
async fn failed_upload_never_publishes() {
  let (_dir, files) = snapshot();
  let api = FakeApi::with(vec![existing(5, false, &[])]);
  api.lock().fail_upload = true;
  let publisher = Publisher::new(api, metadata());

  let err = publisher
    .publish(&files, PublishMode::Publish, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Status { status: 500, .. }));
  assert!(!publisher.api().calls().iter().any(|c| c.starts_with("publish")));
}

#[tokio::test]
async fn nothing_to_publish_is_an_error() {
  let publisher = Publisher::new(FakeApi::default(), metadata());
  let err = publisher.publish(&[], PublishMode::Update, None).await.unwrap_err();
  assert!(matches!(err, Error::NoFiles));
}

#[test]
fn draft_id_comes_from_the_last_link_segment() {
  let mut dep = existing(1, true, &[]);
  dep.links.latest_draft = Some("https://zenodo.org/api/deposit/depositions/12345".into());
  assert_eq!(dep.latest_draft_id(), Some(12345));

  dep.links.latest_draft = Some("https://zenodo.org/api/deposit/depositions/".into());
  assert_eq!(dep.latest_draft_id(), None);

  dep.links.latest_draft = None;
  assert_eq!(dep.latest_draft_id(), None);
}

#[test]
fn modes_parse_from_their_cli_names() {
  assert_eq!("create".parse::<PublishMode>().unwrap(), PublishMode::Create);
  assert_eq!("update".parse::<PublishMode>().unwrap(), PublishMode::Update);
  assert_eq!("publish".parse::<PublishMode>().unwrap(), PublishMode::Publish);
  assert!("finalise".parse::<PublishMode>().is_err());
}
