//! Integration tests for `OutputStore` against an in-memory database.

use rusqlite::types::Value;

use dbbe_core::{
  biblio::BiblioType,
  document::{NamedRef, RoleRef},
  entity::EntityKind,
  hierarchy::{HierarchyKind, HierarchyNode},
  record::{
    BiblioDetails, BiblioRecord, ContainerLink, ManuscriptRecord, PersonRecord, ReferenceLink,
    Relation, TypeRecord, VerseRecord,
  },
};

use crate::{
  LookupKind, OutputStore, SchemaPart, StoreOptions, hierarchy::insert_chain, lookup::Lookups,
};

async fn store() -> OutputStore {
  OutputStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn rows(store: &OutputStore, sql: &str) -> Vec<Vec<Value>> {
  let sql = sql.to_owned();
  store
    .transaction(move |conn| {
      let mut stmt = conn.prepare(&sql)?;
      let width = stmt.column_count();
      let rows = stmt
        .query_map([], |r| (0..width).map(|i| r.get::<_, Value>(i)).collect())?
        .collect::<rusqlite::Result<Vec<Vec<Value>>>>()?;
      Ok(rows)
    })
    .await
    .unwrap()
}

fn named(id: i64, name: &str) -> NamedRef {
  NamedRef {
    id:   Some(id),
    name: Some(name.to_owned()),
  }
}

fn node(id: i64, name: &str, parent_id: Option<i64>) -> HierarchyNode {
  HierarchyNode {
    id,
    name: Some(name.to_owned()),
    alt_name: None,
    parent_id,
  }
}

fn int(v: i64) -> Value { Value::Integer(v) }

fn text(v: &str) -> Value { Value::Text(v.to_owned()) }

fn biblio(id: i64, biblio_type: BiblioType) -> BiblioRecord {
  BiblioRecord {
    id,
    biblio_type,
    title: Some(format!("entry {id}")),
    title_sort_key: None,
    created: None,
    modified: None,
    public_comment: None,
    private_comment: None,
    details: BiblioDetails::None,
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_init_is_idempotent() {
  let s = store().await;
  s.init_schema().await.unwrap();
  s.init_schema().await.unwrap();
  assert_eq!(s.count("person").await.unwrap(), 0);
  assert_eq!(s.count("occurrence_bib_varia").await.unwrap(), 0);
}

#[tokio::test]
async fn ensure_schema_adds_missing_columns() {
  let s = store().await;
  s.transaction(|conn| {
    conn.execute_batch("ALTER TABLE person DROP COLUMN full_name")?;
    Ok(())
  })
  .await
  .unwrap();
  assert!(!s.columns("person").await.unwrap().contains(&"full_name".to_owned()));

  s.ensure_schema(SchemaPart::Person).await.unwrap();
  assert!(s.columns("person").await.unwrap().contains(&"full_name".to_owned()));
}

#[tokio::test]
async fn open_creates_parent_directory() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("nested").join("export.sqlite");
  let s = OutputStore::open(&path, StoreOptions::default()).await.unwrap();
  s.checkpoint().await.unwrap();
  assert!(path.exists());
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lookup_keeps_first_seen_name() {
  let s = store().await;
  let (first, second) = s
    .transaction(|conn| {
      let lookups = Lookups::new(conn);
      let first = lookups.resolve_or_create(LookupKind::Management, &named(7, "checked"))?;
      let second = lookups.resolve_or_create(LookupKind::Management, &named(7, "renamed"))?;
      Ok((first, second))
    })
    .await
    .unwrap();

  assert_eq!(first, Some(7));
  assert_eq!(second, Some(7));
  assert_eq!(rows(&s, "SELECT id, name FROM management").await, vec![vec![
    int(7),
    text("checked")
  ]]);
}

#[tokio::test]
async fn lookup_fills_missing_name_but_skips_missing_id() {
  let s = store().await;
  let unnamed = NamedRef {
    id:   Some(3),
    name: None,
  };
  let anonymous = NamedRef {
    id:   None,
    name: Some("ghost".into()),
  };
  s.transaction(move |conn| {
    let lookups = Lookups::new(conn);
    assert_eq!(lookups.resolve_or_create(LookupKind::Genre, &unnamed)?, Some(3));
    assert_eq!(lookups.resolve_or_create(LookupKind::Genre, &named(3, "Epigram"))?, Some(3));
    assert_eq!(lookups.resolve_or_create(LookupKind::Genre, &anonymous)?, None);
    Ok(())
  })
  .await
  .unwrap();

  assert_eq!(rows(&s, "SELECT id, name FROM genre").await, vec![vec![int(3), text("Epigram")]]);
}

#[tokio::test]
async fn roles_are_case_insensitive() {
  let s = store().await;
  let (a, b) = s
    .transaction(|conn| {
      let lookups = Lookups::new(conn);
      Ok((lookups.role("Scribe")?, lookups.role("scribe")?))
    })
    .await
    .unwrap();
  assert_eq!(a, b);
  assert_eq!(s.count("role").await.unwrap(), 1);
}

// ─── Hierarchies ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn chains_insert_root_first_and_share_nodes() {
  let s = store().await;
  let leaves = s
    .transaction(|conn| {
      let a = insert_chain(conn, HierarchyKind::Region, &[
        node(1, "Europe", None),
        node(2, "Italy", Some(1)),
        node(3, "Rome", Some(2)),
      ])?;
      let b = insert_chain(conn, HierarchyKind::Region, &[
        node(1, "Europe", None),
        node(4, "Greece", Some(1)),
      ])?;
      let none = insert_chain(conn, HierarchyKind::Content, &[])?;
      Ok((a, b, none))
    })
    .await
    .unwrap();

  assert_eq!(leaves, (Some(3), Some(4), None));
  assert_eq!(s.count("location").await.unwrap(), 4);
  assert_eq!(rows(&s, "SELECT parent_id FROM location WHERE id = 3").await, vec![vec![int(2)]]);
}

// ─── Entity writers ──────────────────────────────────────────────────────────

#[tokio::test]
async fn verses_stub_their_occurrence_and_manuscript() {
  let s = store().await;
  let report = s
    .write_verses(vec![VerseRecord {
      id: 100,
      text: Some("ἀρχὴ".into()),
      order: Some(1),
      occurrence_id: Some(10),
      manuscript_id: Some(5),
      verse_group_id: Some(77),
    }])
    .await
    .unwrap();

  assert_eq!(report.written, 1);
  assert_eq!(rows(&s, "SELECT id, manuscript_id FROM occurrence").await, vec![vec![
    int(10),
    int(5)
  ]]);
  assert_eq!(s.count("manuscript").await.unwrap(), 1);
}

fn person(id: i64, last_name: &str) -> PersonRecord {
  PersonRecord {
    id,
    last_name: Some(last_name.to_owned()),
    origination: vec![node(1, "Byzantium", None), node(2, "Constantinople", Some(1))],
    management: vec![named(1, "checked")],
    ..Default::default()
  }
}

#[tokio::test]
async fn person_rerun_updates_scalars_and_keeps_joins() {
  let s = store().await;
  s.write_persons(vec![person(1, "Psellos"), person(2, "Planoudes")])
    .await
    .unwrap();
  let joins_before = s.snapshot("person_management").await.unwrap();

  s.write_persons(vec![person(1, "Psellus"), person(2, "Planoudes"), person(3, "Tzetzes")])
    .await
    .unwrap();

  assert_eq!(s.count("person").await.unwrap(), 3);
  assert_eq!(rows(&s, "SELECT last_name, location_id FROM person WHERE id = 1").await, vec![
    vec![text("Psellus"), int(2)]
  ]);
  let joins_after = s.snapshot("person_management").await.unwrap();
  assert_eq!(joins_after.len(), 3);
  assert!(joins_before.iter().all(|row| joins_after.contains(row)));
}

#[tokio::test]
async fn role_edges_require_an_existing_person() {
  let s = store().await;
  s.write_persons(vec![person(1, "Psellos")]).await.unwrap();

  let report = s
    .write_manuscripts(vec![ManuscriptRecord {
      id: 50,
      roles: vec![
        RoleRef {
          role:      "Scribe",
          person_id: 1,
        },
        RoleRef {
          role:      "Owner",
          person_id: 99,
        },
      ],
      ..Default::default()
    }])
    .await
    .unwrap();

  assert_eq!(report.written, 1);
  assert_eq!(report.skipped_edges, 1);
  assert_eq!(s.count("manuscript_person_role").await.unwrap(), 1);
}

#[tokio::test]
async fn manuscript_links_the_leaf_of_each_content_chain() {
  let s = store().await;
  s.write_manuscripts(vec![ManuscriptRecord {
    id: 50,
    content: vec![vec![node(10, "Poetry", None), node(11, "Epigram", Some(10))]],
    collection: Some(named(4, "Barocci")),
    ..Default::default()
  }])
  .await
  .unwrap();

  assert_eq!(rows(&s, "SELECT manuscript_id, content_id FROM manuscript_content").await, vec![
    vec![int(50), int(11)]
  ]);
  assert_eq!(s.count("content").await.unwrap(), 2);
  assert_eq!(rows(&s, "SELECT collection_id FROM manuscript").await, vec![vec![int(4)]]);
}

fn ty(id: i64) -> TypeRecord {
  TypeRecord {
    id,
    ..Default::default()
  }
}

#[tokio::test]
async fn type_relations_are_guarded_and_canonical() {
  let s = store().await;
  s.write_types(vec![ty(1), ty(2)]).await.unwrap();

  let relations = vec![
    Relation::undirected(2, 1, 5, "related").unwrap(),
    Relation::undirected(1, 2, 5, "related").unwrap(),
    Relation::undirected(1, 3, 5, "related").unwrap(),
  ];
  let report = s.write_type_relations(relations).await.unwrap();

  assert_eq!(report.written, 1);
  assert_eq!(report.skipped_edges, 1);
  assert_eq!(
    rows(
      &s,
      "SELECT type_id, related_type_id, relation_definition_id FROM type_related_type",
    )
    .await,
    vec![vec![int(1), int(2), int(5)]]
  );

  let reversed = s
    .transaction(|conn| {
      conn.execute("INSERT INTO type_related_type (type_id, related_type_id) VALUES (2, 1)", [])?;
      Ok(())
    })
    .await;
  assert!(reversed.is_err());
}

#[tokio::test]
async fn occurrence_self_relations_are_rejected() {
  let s = store().await;
  s.write_verses(vec![VerseRecord {
    id: 1,
    occurrence_id: Some(10),
    ..Default::default()
  }])
  .await
  .unwrap();

  let result = s
    .transaction(|conn| {
      conn.execute(
        "INSERT INTO occurrence_related_occurrence (occurrence_id, related_occurrence_id) \
         VALUES (10, 10)",
        [],
      )?;
      Ok(())
    })
    .await;
  assert!(result.is_err());
}

// ─── Bibliographies ──────────────────────────────────────────────────────────

#[tokio::test]
async fn subtype_details_and_containers_are_written() {
  let s = store().await;
  let mut thesis = biblio(3, BiblioType::Phd);
  thesis.details = BiblioDetails::Phd {
    city:        Some("Gent".into()),
    year:        Some(2010),
    institution: Some("UGent".into()),
    volume:      None,
    forthcoming: Some(false),
  };
  let entries = vec![biblio(1, BiblioType::Book), biblio(2, BiblioType::BookChapter), thesis];
  s.write_bibliographies(entries).await.unwrap();
  s.write_containers(vec![ContainerLink {
    biblio_type:  BiblioType::BookChapter,
    content_id:   2,
    container_id: 1,
  }])
  .await
  .unwrap();

  assert_eq!(rows(&s, "SELECT city, year FROM phd").await, vec![vec![text("Gent"), int(2010)]]);
  assert_eq!(rows(&s, "SELECT id, book_id, title FROM book_chapter").await, vec![vec![
    int(2),
    int(1),
    text("entry 2")
  ]]);
}

#[tokio::test]
async fn references_stub_targets_and_cleanup_drops_empty_columns() {
  let s = store().await;
  s.write_bibliographies(vec![biblio(1, BiblioType::Article)])
    .await
    .unwrap();

  let link = |entity_id, page_start| ReferenceLink {
    entity: EntityKind::Occurrence,
    entity_id,
    biblio_type: BiblioType::Article,
    biblio_id: 1,
    page_start,
    page_end: None,
    raw_pages: None,
    url: None,
    source_remark: None,
    image: None,
  };
  let report = s
    .write_references(vec![link(10, Some(4)), link(11, None), link(10, Some(4))])
    .await
    .unwrap();
  assert_eq!(report.written, 2);
  assert_eq!(s.count("occurrence").await.unwrap(), 2);

  let query = "SELECT occurrence_id, article_id, page_start FROM occurrence_article ORDER BY 1";
  let before = rows(&s, query).await;

  let pruned = s.prune_empty_columns().await.unwrap();
  let cols = s.columns("occurrence_article").await.unwrap();
  assert_eq!(cols, ["occurrence_id", "article_id", "page_start"]);
  assert!(pruned.iter().any(|p| p.table == "occurrence_article" && p.column == "image"));
  assert_eq!(rows(&s, query).await, before);

  // A second pass finds nothing more to drop in that table.
  let again = s.prune_empty_columns().await.unwrap();
  assert!(again.iter().all(|p| p.table != "occurrence_article"));
}
