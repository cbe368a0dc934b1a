//! Elasticsearch implementation of [`DocumentStore`].
//!
//! Collections map to concrete indices by name: the client lists the
//! cluster's indices once per call and picks the one that carries the
//! configured prefix and ends with the collection name. A collection with no
//! index reads as empty.

use std::{collections::HashMap, time::Duration};

use dbbe_core::{
  document::Document,
  source::{Collection, DocumentStore},
};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{Error, Result};

/// How long the cluster keeps a scroll context alive between pages.
const SCROLL_KEEP_ALIVE: &str = "2m";

/// Connection settings for the Elasticsearch cluster.
#[derive(Debug, Clone)]
pub struct ElasticConfig {
  pub base_url:     String,
  pub username:     Option<String>,
  pub password:     Option<String>,
  /// Only indices starting with this prefix are considered.
  pub index_prefix: String,
  pub timeout:      Duration,
}

/// Async client for the subset of the Elasticsearch REST API the export uses.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ElasticClient {
  client: Client,
  config: ElasticConfig,
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct CatIndex {
  pub index: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
  #[serde(rename = "_scroll_id")]
  pub scroll_id: Option<String>,
  pub hits:      Hits,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hits {
  #[serde(default)]
  pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hit {
  #[serde(rename = "_id")]
  pub id:     String,
  #[serde(rename = "_source", default)]
  pub source: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MgetResponse {
  #[serde(default)]
  pub docs: Vec<MgetDoc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MgetDoc {
  #[serde(rename = "_id")]
  pub id:     String,
  #[serde(default)]
  pub found:  bool,
  #[serde(rename = "_source")]
  pub source: Option<Value>,
}

impl Hit {
  fn into_document(self) -> Document { Document::new(self.id, self.source) }
}

/// Picks the index holding `collection` among the cluster's `indices`.
///
/// An exact `{prefix}_{collection}` match wins; otherwise the lexically
/// greatest prefixed index ending in the collection name is used, so dated
/// rebuilds resolve to the newest.
pub(crate) fn resolve_index(
  indices: &[String],
  prefix: &str,
  collection: Collection,
) -> Option<String> {
  let suffix = collection.to_string();
  let exact = format!("{prefix}_{suffix}");
  if indices.iter().any(|i| *i == exact) {
    return Some(exact);
  }
  indices
    .iter()
    .filter(|i| i.starts_with(prefix) && i.ends_with(&suffix))
    .max()
    .cloned()
}

/// Folds an `_mget` response into a lookup keyed by every requested id.
pub(crate) fn collect_mget(
  ids: &[String],
  response: MgetResponse,
) -> HashMap<String, Option<Value>> {
  let mut out: HashMap<String, Option<Value>> = ids.iter().map(|id| (id.clone(), None)).collect();
  for doc in response.docs {
    if doc.found {
      out.insert(doc.id, doc.source);
    }
  }
  out
}

// ─── Client ──────────────────────────────────────────────────────────────────

impl ElasticClient {
  pub fn new(config: ElasticConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    match &self.config.username {
      Some(user) if !user.is_empty() => req.basic_auth(user, self.config.password.as_deref()),
      _ => req,
    }
  }

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

  async fn post_json<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> Result<T> {
    let resp = self
      .auth(self.client.post(self.url(path)))
      .json(body)
      .send()
      .await?;
    let resp = Self::check("POST", path, resp).await?;
    Ok(resp.json().await?)
  }

  /// Names of every index in the cluster carrying the configured prefix.
  pub async fn indices(&self) -> Result<Vec<String>> {
    let path = "_cat/indices?format=json";
    let resp = self.auth(self.client.get(self.url(path))).send().await?;
    let resp = Self::check("GET", path, resp).await?;
    let indices: Vec<CatIndex> = resp.json().await?;
    Ok(
      indices
        .into_iter()
        .map(|i| i.index)
        .filter(|i| i.starts_with(&self.config.index_prefix))
        .collect(),
    )
  }

  async fn index_for(&self, collection: Collection) -> Result<Option<String>> {
    let indices = self.indices().await?;
    let index = resolve_index(&indices, &self.config.index_prefix, collection);
    match &index {
      Some(index) => debug!(%collection, %index, "resolved index"),
      None => warn!(
        %collection,
        prefix = %self.config.index_prefix,
        "no index found; reading as empty"
      ),
    }
    Ok(index)
  }

  async fn clear_scroll(&self, scroll_id: String) {
    let path = "_search/scroll";
    let result = self
      .auth(self.client.delete(self.url(path)))
      .json(&json!({ "scroll_id": [scroll_id] }))
      .send()
      .await;
    if let Err(e) = result {
      warn!(error = %e, "failed to clear scroll context");
    }
  }
}

impl DocumentStore for ElasticClient {
  type Error = Error;

  async fn scroll_all(&self, collection: Collection, page_size: usize) -> Result<Vec<Document>> {
    let Some(index) = self.index_for(collection).await? else {
      return Ok(Vec::new());
    };

    let first: SearchResponse = self
      .post_json(
        &format!("{index}/_search?scroll={SCROLL_KEEP_ALIVE}"),
        &json!({ "query": { "match_all": {} }, "size": page_size }),
      )
      .await?;

    let mut scroll_id = first.scroll_id;
    let mut page = first.hits.hits;
    let mut docs = Vec::new();

    while !page.is_empty() {
      docs.extend(page.drain(..).map(Hit::into_document));
      let Some(id) = scroll_id.clone() else { break };

      let next: SearchResponse = self
        .post_json(
          "_search/scroll",
          &json!({ "scroll": SCROLL_KEEP_ALIVE, "scroll_id": id }),
        )
        .await?;
      scroll_id = next.scroll_id.or(scroll_id);
      page = next.hits.hits;
    }

    if let Some(id) = scroll_id {
      self.clear_scroll(id).await;
    }

    debug!(%collection, %index, documents = docs.len(), "scrolled collection");
    Ok(docs)
  }

  async fn multi_get<'a>(
    &'a self,
    collection: Collection,
    ids: &'a [String],
  ) -> Result<HashMap<String, Option<Value>>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let Some(index) = self.index_for(collection).await? else {
      return Ok(ids.iter().map(|id| (id.clone(), None)).collect());
    };

    let response: MgetResponse = self
      .post_json(&format!("{index}/_mget"), &json!({ "ids": ids }))
      .await?;
    Ok(collect_mget(ids, response))
  }
}
