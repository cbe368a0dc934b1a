//! HTTP implementation of [`DepositionApi`].

use std::time::Duration;

use reqwest::{
  Client, RequestBuilder, Response, StatusCode,
  multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::{
  Error, Result,
  api::{Deposition, DepositionApi, DepositionFile, Metadata},
};

/// Async client for the deposition REST API, authenticated by bearer token.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ZenodoClient {
  client:  Client,
  api_url: String,
  token:   String,
}

impl ZenodoClient {
  /// `api_url` is the depositions collection, e.g.
  /// `https://zenodo.org/api/deposit/depositions`.
  pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(600))
      .build()?;
    Ok(Self {
      client,
      api_url: api_url.into().trim_end_matches('/').to_owned(),
      token: token.into(),
    })
  }

  fn url(&self, path: &str) -> String {
    if path.is_empty() {
      self.api_url.clone()
    } else {
      format!("{}/{}", self.api_url, path)
    }
  }

  fn request(&self, req: RequestBuilder) -> RequestBuilder { req.bearer_auth(&self.token) }

  async fn check(method: &'static str, path: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status {
      method,
      path: path.to_owned(),
      status: status.as_u16(),
      body,
    })
  }

  async fn send_json<T: DeserializeOwned>(
    &self,
    method: &'static str,
    path: &str,
    req: RequestBuilder,
  ) -> Result<T> {
    debug!(method, path, "deposition request");
    let resp = self.request(req).send().await?;
    let resp = Self::check(method, path, resp).await?;
    Ok(resp.json().await?)
  }
}

impl DepositionApi for ZenodoClient {
  /// `GET /`
  async fn list_depositions(&self) -> Result<Vec<Deposition>> {
    self.send_json("GET", "", self.client.get(self.url(""))).await
  }

  /// `POST /`
  async fn create_deposition<'a>(&'a self, metadata: &'a Metadata) -> Result<Deposition> {
    let req = self.client.post(self.url("")).json(&json!({ "metadata": metadata }));
    self.send_json("POST", "", req).await
  }

  /// `GET /{id}`
  async fn get_deposition(&self, id: u64) -> Result<Option<Deposition>> {
    let path = id.to_string();
    let resp = self.request(self.client.get(self.url(&path))).send().await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let resp = Self::check("GET", &path, resp).await?;
    Ok(Some(resp.json().await?))
  }

  /// `POST /{id}/actions/newversion`
  async fn create_new_version(&self, id: u64) -> Result<Deposition> {
    let path = format!("{id}/actions/newversion");
    self
      .send_json("POST", &path, self.client.post(self.url(&path)))
      .await
  }

  /// `PUT /{id}`
  async fn update_metadata<'a>(&'a self, id: u64, metadata: &'a Metadata) -> Result<Deposition> {
    let path = id.to_string();
    let req = self.client.put(self.url(&path)).json(&json!({ "metadata": metadata }));
    self.send_json("PUT", &path, req).await
  }

  /// `DELETE /{id}/files/{file_id}`
  async fn delete_file<'a>(&'a self, id: u64, file_id: &'a str) -> Result<()> {
    let path = format!("{id}/files/{file_id}");
    let resp = self.request(self.client.delete(self.url(&path))).send().await?;
    Self::check("DELETE", &path, resp).await?;
    Ok(())
  }

  /// `POST /{id}/files` as multipart with `name` and `file` parts.
  async fn upload_file<'a>(
    &'a self,
    id: u64,
    name: &'a str,
    bytes: Vec<u8>,
  ) -> Result<DepositionFile> {
    let path = format!("{id}/files");
    let form = Form::new()
      .text("name", name.to_owned())
      .part("file", Part::bytes(bytes).file_name(name.to_owned()));
    let req = self.client.post(self.url(&path)).multipart(form);
    self.send_json("POST", &path, req).await
  }

  /// `POST /{id}/actions/publish`
  async fn publish(&self, id: u64) -> Result<Deposition> {
    let path = format!("{id}/actions/publish");
    self
      .send_json("POST", &path, self.client.post(self.url(&path)))
      .await
  }
}
