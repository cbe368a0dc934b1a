use dbbe_core::source::Collection;
use serde_json::json;

use crate::elastic::{MgetResponse, SearchResponse, collect_mget, resolve_index};

fn names(list: &[&str]) -> Vec<String> { list.iter().map(|s| s.to_string()).collect() }

// ─── Index resolution ────────────────────────────────────────────────────────

#[test]
fn exact_index_name_wins() {
  let indices = names(&["dbbe_dev_types_2024", "dbbe_dev_types", "dbbe_dev_persons"]);
  assert_eq!(
    resolve_index(&indices, "dbbe_dev", Collection::Types).as_deref(),
    Some("dbbe_dev_types")
  );
}

#[test]
fn bibliographies_resolve_to_their_own_index() {
  let indices = names(&["dbbe_dev_bibliographies", "dbbe_dev_manuscripts"]);
  assert_eq!(
    resolve_index(&indices, "dbbe_dev", Collection::Bibliographies).as_deref(),
    Some("dbbe_dev_bibliographies")
  );
}

#[test]
fn suffix_match_picks_newest() {
  let indices = names(&["dbbe_dev_20240101_verses", "dbbe_dev_20250101_verses", "other_verses"]);
  assert_eq!(
    resolve_index(&indices, "dbbe_dev", Collection::Verses).as_deref(),
    Some("dbbe_dev_20250101_verses")
  );
}

#[test]
fn missing_collection_resolves_to_none() {
  let indices = names(&["dbbe_dev_persons", "prod_occurrences"]);
  assert!(resolve_index(&indices, "dbbe_dev", Collection::Occurrences).is_none());
}

// ─── Response parsing ────────────────────────────────────────────────────────

#[test]
fn search_response_yields_documents() {
  let raw = json!({
    "_scroll_id": "abc",
    "hits": { "hits": [
      { "_id": "7", "_source": { "name": "Manuel" } },
      { "_id": "8" }
    ]}
  });
  let resp: SearchResponse = serde_json::from_value(raw).unwrap();
  assert_eq!(resp.scroll_id.as_deref(), Some("abc"));
  assert_eq!(resp.hits.hits.len(), 2);
  assert_eq!(resp.hits.hits[0].id, "7");
  assert_eq!(resp.hits.hits[0].source["name"], "Manuel");
  assert!(resp.hits.hits[1].source.is_null());
}

#[test]
fn mget_reports_every_requested_id() {
  let raw = json!({
    "docs": [
      { "_id": "1", "found": true, "_source": { "title": "Byzantine Epigrams" } },
      { "_id": "2", "found": false }
    ]
  });
  let resp: MgetResponse = serde_json::from_value(raw).unwrap();
  let ids = names(&["1", "2", "3"]);
  let out = collect_mget(&ids, resp);

  assert_eq!(out.len(), 3);
  assert_eq!(out["1"].as_ref().unwrap()["title"], "Byzantine Epigrams");
  assert!(out["2"].is_none());
  assert!(out["3"].is_none());
}
