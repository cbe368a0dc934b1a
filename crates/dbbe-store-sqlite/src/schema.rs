//! Declarative output schema.
//!
//! Every table is described once as a [`TableDef`]. The same description
//! drives `CREATE TABLE`, additive column evolution, the write statement used
//! for the table (its [`WriteMode`] follows from its [`TableRole`]) and the
//! cleanup pass. The bibliography family is generated from
//! [`BiblioType`] rather than written out per subtype.

use std::{collections::HashMap, sync::LazyLock};

use dbbe_core::{biblio::BiblioType, entity::EntityKind};

use crate::{Error, Result};

// ─── Write semantics ─────────────────────────────────────────────────────────

/// How rows are written into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
  /// Insert, or replace every written column when the key already exists.
  Upsert,
  /// Insert, or do nothing when the key already exists.
  InsertOrIgnore,
}

/// What a table holds. The role fixes the write mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
  /// Primary entity rows, owned by one migrator and refreshed on every run.
  Entity,
  /// Shared vocabulary rows; the first-seen name wins.
  Lookup,
  /// Parent-pointer hierarchy nodes.
  Hierarchy,
  /// Many-to-many and single-valued association rows.
  Join,
}

impl TableRole {
  pub fn write_mode(self) -> WriteMode {
    match self {
      Self::Entity => WriteMode::Upsert,
      Self::Lookup | Self::Hierarchy | Self::Join => WriteMode::InsertOrIgnore,
    }
  }
}

// ─── Table definitions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
  pub name:     String,
  pub decl:     String,
  /// May be dropped by the cleanup pass when no row uses it.
  pub prunable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
  pub name:        String,
  pub role:        TableRole,
  pub columns:     Vec<ColumnDef>,
  pub key:         Vec<String>,
  pub constraints: Vec<String>,
}

impl TableDef {
  fn new(name: impl Into<String>, role: TableRole) -> Self {
    Self {
      name: name.into(),
      role,
      columns: Vec::new(),
      key: Vec::new(),
      constraints: Vec::new(),
    }
  }

  fn col(mut self, name: impl Into<String>, decl: impl Into<String>) -> Self {
    self.columns.push(ColumnDef {
      name:     name.into(),
      decl:     decl.into(),
      prunable: false,
    });
    self
  }

  fn prunable(mut self, name: &str, decl: &str) -> Self {
    self.columns.push(ColumnDef {
      name:     name.to_owned(),
      decl:     decl.to_owned(),
      prunable: true,
    });
    self
  }

  fn key<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
    self.key = cols.iter().map(|c| c.as_ref().to_owned()).collect();
    self
  }

  fn constraint(mut self, constraint: impl Into<String>) -> Self {
    self.constraints.push(constraint.into());
    self
  }

  pub fn write_mode(&self) -> WriteMode { self.role.write_mode() }

  pub fn column(&self, name: &str) -> Option<&ColumnDef> {
    self.columns.iter().find(|c| c.name == name)
  }

  /// `CREATE TABLE IF NOT EXISTS` for this table.
  pub fn create_sql(&self) -> String {
    self.create_sql_as(&self.name, |_| true)
  }

  /// DDL for a copy of this table under another name, restricted to the
  /// columns accepted by `keep`. Key columns are always kept.
  pub fn create_sql_as(&self, name: &str, keep: impl Fn(&ColumnDef) -> bool) -> String {
    let mut parts: Vec<String> = self
      .columns
      .iter()
      .filter(|c| self.key.contains(&c.name) || keep(c))
      .map(|c| format!("{} {}", c.name, c.decl))
      .collect();
    if !self.key.is_empty() {
      parts.push(format!("PRIMARY KEY ({})", self.key.join(", ")));
    }
    parts.extend(self.constraints.iter().cloned());
    format!("CREATE TABLE IF NOT EXISTS {name} (\n  {}\n)", parts.join(",\n  "))
  }

  /// Write statement for the given columns, following the table's mode.
  pub fn insert_sql(&self, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let head = format!(
      "INTO {} ({}) VALUES ({})",
      self.name,
      columns.join(", "),
      placeholders.join(", ")
    );

    match self.write_mode() {
      WriteMode::InsertOrIgnore => format!("INSERT OR IGNORE {head}"),
      WriteMode::Upsert => {
        let updates: Vec<String> = columns
          .iter()
          .filter(|c| !self.key.iter().any(|k| k == *c))
          .map(|c| format!("{c} = excluded.{c}"))
          .collect();
        if updates.is_empty() {
          format!("INSERT {head} ON CONFLICT ({}) DO NOTHING", self.key.join(", "))
        } else {
          format!(
            "INSERT {head} ON CONFLICT ({}) DO UPDATE SET {}",
            self.key.join(", "),
            updates.join(", ")
          )
        }
      }
    }
  }
}

// ─── Builders ────────────────────────────────────────────────────────────────

const ID: &str = "INTEGER NOT NULL";

fn fk(table: &str) -> String { format!("INTEGER REFERENCES {table}(id)") }

fn fk_required(table: &str) -> String {
  format!("INTEGER NOT NULL REFERENCES {table}(id)")
}

fn entity(name: &str) -> TableDef {
  TableDef::new(name, TableRole::Entity).col("id", ID).key(&["id"])
}

fn lookup(name: &str) -> TableDef {
  TableDef::new(name, TableRole::Lookup)
    .col("id", ID)
    .col("name", "TEXT")
    .key(&["id"])
}

fn hierarchy(name: &str) -> TableDef {
  TableDef::new(name, TableRole::Hierarchy)
    .col("id", ID)
    .col("name", "TEXT")
    .col("parent_id", fk(name))
    .key(&["id"])
}

/// `{owner}_{member}` association keyed by both ids.
fn join(owner: &str, member: &str) -> TableDef {
  let owner_col = format!("{owner}_id");
  let member_col = format!("{member}_id");
  TableDef::new(format!("{owner}_{member}"), TableRole::Join)
    .col(&owner_col, fk_required(owner))
    .col(&member_col, fk_required(member))
    .key(&[owner_col, member_col])
}

/// Single-valued association keyed by the owner only.
fn single_join(owner: &str, member: &str) -> TableDef {
  let owner_col = format!("{owner}_id");
  TableDef::new(format!("{owner}_{member}"), TableRole::Join)
    .col(&owner_col, fk_required(owner))
    .col(format!("{member}_id"), fk_required(member))
    .key(&[owner_col])
}

fn person_role(owner: &str) -> TableDef {
  let owner_col = format!("{owner}_id");
  TableDef::new(format!("{owner}_person_role"), TableRole::Join)
    .col(&owner_col, fk_required(owner))
    .col("person_id", fk_required("person"))
    .col("role_id", fk_required("role"))
    .key(&[owner_col.as_str(), "person_id", "role_id"])
}

/// Self-referential relation with a definition column.
fn self_relation(owner: &str, definitions: &str, check: &str) -> TableDef {
  let owner_col = format!("{owner}_id");
  let related_col = format!("related_{owner}_id");
  TableDef::new(format!("{owner}_related_{owner}"), TableRole::Join)
    .col(&owner_col, fk_required(owner))
    .col(&related_col, fk_required(owner))
    .col("relation_definition_id", fk(definitions))
    .key(&[owner_col.as_str(), related_col.as_str()])
    .constraint(format!("CHECK ({owner_col} {check} {related_col})"))
}

// ─── Schema parts ────────────────────────────────────────────────────────────

/// Groups of tables, one per pipeline step that owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaPart {
  /// Shared lookups and hierarchies.
  Shared,
  Verse,
  Person,
  Manuscript,
  Bibliography,
  Occurrence,
  Type,
}

const PARTS: [SchemaPart; 7] = [
  SchemaPart::Shared,
  SchemaPart::Verse,
  SchemaPart::Person,
  SchemaPart::Manuscript,
  SchemaPart::Bibliography,
  SchemaPart::Occurrence,
  SchemaPart::Type,
];

impl SchemaPart {
  pub fn all() -> impl Iterator<Item = Self> { PARTS.into_iter() }

  pub fn tables(self) -> Vec<TableDef> {
    match self {
      Self::Shared => shared_tables(),
      Self::Verse => vec![
        entity("verse")
          .col("text", "TEXT")
          .col("order_in_occurrence", "INTEGER")
          .col("occurrence_id", fk("occurrence"))
          .col("verse_group_id", "INTEGER"),
      ],
      Self::Person => person_tables(),
      Self::Manuscript => manuscript_tables(),
      Self::Bibliography => bibliography_tables(),
      Self::Occurrence => occurrence_tables(),
      Self::Type => type_tables(),
    }
  }
}

fn shared_tables() -> Vec<TableDef> {
  vec![
    TableDef::new("role", TableRole::Lookup)
      .col("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
      .col("name", "TEXT NOT NULL UNIQUE COLLATE NOCASE"),
    lookup("management"),
    lookup("acknowledgement"),
    lookup("self_designation"),
    lookup("office"),
    lookup("keyword"),
    lookup("genre"),
    lookup("metre"),
    lookup("tag"),
    lookup("text_status"),
    lookup("editorial_status"),
    lookup("collection"),
    TableDef::new("identification", TableRole::Lookup)
      .col("id", "INTEGER PRIMARY KEY AUTOINCREMENT")
      .col("type", "TEXT NOT NULL")
      .col("identifier_value", "TEXT NOT NULL")
      .constraint("UNIQUE (type, identifier_value)"),
    hierarchy("location").col("historical_name", "TEXT"),
    hierarchy("content"),
    TableDef::new("library", TableRole::Lookup)
      .col("id", ID)
      .col("name", "TEXT")
      .col("location_id", fk("location"))
      .key(&["id"]),
    TableDef::new("occurrence_relation_definition", TableRole::Lookup)
      .col("id", ID)
      .col("definition", "TEXT NOT NULL UNIQUE")
      .key(&["id"]),
    TableDef::new("type_relation_definition", TableRole::Lookup)
      .col("id", ID)
      .col("definition", "TEXT NOT NULL UNIQUE")
      .key(&["id"]),
  ]
}

fn person_tables() -> Vec<TableDef> {
  vec![
    entity("person")
      .col("first_name", "TEXT")
      .col("last_name", "TEXT")
      .col("full_name", "TEXT")
      .col("born_date_floor_year", "INTEGER")
      .col("born_date_ceiling_year", "INTEGER")
      .col("death_date_floor_year", "INTEGER")
      .col("death_date_ceiling_year", "INTEGER")
      .col("is_historical", "BOOLEAN")
      .col("is_modern", "BOOLEAN")
      .col("is_dbbe", "BOOLEAN")
      .col("created", "TEXT")
      .col("modified", "TEXT")
      .col("public_comment", "TEXT")
      .col("private_comment", "TEXT")
      .col("location_id", fk("location")),
    join("person", "management"),
    join("person", "acknowledgement"),
    join("person", "self_designation"),
    join("person", "office"),
    join("person", "identification"),
  ]
}

fn manuscript_tables() -> Vec<TableDef> {
  vec![
    entity("manuscript")
      .col("name", "TEXT")
      .col("shelf", "TEXT")
      .col("completion_floor", "INTEGER")
      .col("completion_ceiling", "INTEGER")
      .col("created", "TEXT")
      .col("modified", "TEXT")
      .col("number_of_occurrences", "INTEGER")
      .col("library_id", fk("library"))
      .col("collection_id", fk("collection")),
    join("manuscript", "management"),
    join("manuscript", "acknowledgement"),
    join("manuscript", "content"),
    join("manuscript", "identification"),
    join("manuscript", "location"),
    person_role("manuscript"),
  ]
}

fn occurrence_tables() -> Vec<TableDef> {
  vec![
    entity("occurrence")
      .col("manuscript_id", fk("manuscript"))
      .col("created", "TEXT")
      .col("modified", "TEXT")
      .col("public_comment", "TEXT")
      .col("private_comment", "TEXT")
      .col("is_dbbe", "BOOLEAN")
      .col("incipit", "TEXT")
      .col("text_stemmer", "TEXT")
      .col("text_original", "TEXT")
      .col("location", "TEXT")
      .col("date_floor_year", "TEXT")
      .col("date_ceiling_year", "TEXT")
      .col("palaeographical_info", "TEXT")
      .col("contextual_info", "TEXT")
      .col("title", "TEXT"),
    join("occurrence", "genre"),
    join("occurrence", "metre"),
    join("occurrence", "keyword"),
    join("occurrence", "management"),
    join("occurrence", "acknowledgement"),
    single_join("occurrence", "text_status"),
    person_role("occurrence"),
    self_relation("occurrence", "occurrence_relation_definition", "!="),
  ]
}

fn type_tables() -> Vec<TableDef> {
  vec![
    entity("type")
      .col("text_stemmer", "TEXT")
      .col("text_original", "TEXT")
      .col("lemma", "TEXT")
      .col("incipit", "TEXT")
      .col("created", "TEXT")
      .col("modified", "TEXT")
      .col("public_comment", "TEXT")
      .col("private_comment", "TEXT")
      .col("title", "TEXT")
      .col("number_of_verses", "INTEGER"),
    join("type", "genre"),
    join("type", "metre"),
    join("type", "tag"),
    join("type", "keyword"),
    join("type", "management"),
    join("type", "acknowledgement"),
    join("type", "occurrence"),
    single_join("type", "editorial_status"),
    single_join("type", "text_status"),
    person_role("type"),
    self_relation("type", "type_relation_definition", "<"),
  ]
}

/// Journals, then per subtype: the subtype table, its person-role and
/// management joins, and one reference join per entity kind.
fn bibliography_tables() -> Vec<TableDef> {
  let mut tables = vec![
    entity("journal").col("title", "TEXT").col("title_sort_key", "TEXT"),
    entity("journal_issue")
      .col("journal_id", fk("journal"))
      .col("title", "TEXT")
      .col("title_sort_key", "TEXT"),
  ];

  for bib in BiblioType::all() {
    let mut table = entity(bib.table())
      .col("title", "TEXT")
      .col("title_sort_key", "TEXT")
      .col("created", "TEXT")
      .col("modified", "TEXT")
      .col("public_comment", "TEXT")
      .col("private_comment", "TEXT");
    for (name, decl) in bib.detail_columns() {
      table = table.col(*name, *decl);
    }
    if let Some(container) = bib.container_column() {
      let decl = match bib {
        BiblioType::Article => fk("journal_issue"),
        BiblioType::BookChapter => fk("book"),
        _ => "INTEGER".to_owned(),
      };
      table = table.col(container, decl);
    }
    tables.push(table);
    tables.push(person_role(bib.table()));
    tables.push(join(bib.table(), "management"));

    for kind in [
      EntityKind::Manuscript,
      EntityKind::Person,
      EntityKind::Occurrence,
      EntityKind::Type,
    ] {
      let entity_col = kind.id_column();
      let bib_col = bib.id_column();
      tables.push(
        TableDef::new(bib.reference_table(kind), TableRole::Join)
          .col(entity_col, fk_required(kind.table()))
          .col(&bib_col, fk_required(bib.table()))
          .prunable("page_start", "INTEGER")
          .prunable("page_end", "INTEGER")
          .prunable("raw_pages", "TEXT")
          .prunable("rel_url", "TEXT")
          .prunable("source_remark", "TEXT")
          .prunable("image", "TEXT")
          .key(&[entity_col, bib_col.as_str()]),
      );
    }
  }
  tables
}

// ─── Registry ────────────────────────────────────────────────────────────────

static TABLES: LazyLock<HashMap<String, TableDef>> = LazyLock::new(|| {
  SchemaPart::all()
    .flat_map(SchemaPart::tables)
    .map(|t| (t.name.clone(), t))
    .collect()
});

/// Looks up the definition of an output table.
pub fn table(name: &str) -> Result<&'static TableDef> {
  TABLES
    .get(name)
    .ok_or_else(|| Error::UnknownTable(name.to_owned()))
}

/// Every declared table that has prunable columns.
pub fn prunable_tables() -> impl Iterator<Item = &'static TableDef> {
  TABLES
    .values()
    .filter(|t| t.columns.iter().any(|c| c.prunable))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn entity_tables_upsert_and_joins_ignore() {
    let person = table("person").unwrap();
    let sql = person.insert_sql(&["id", "last_name"]);
    assert_eq!(
      sql,
      "INSERT INTO person (id, last_name) VALUES (?1, ?2) ON CONFLICT (id) DO UPDATE SET \
       last_name = excluded.last_name"
    );

    let join = table("person_management").unwrap();
    assert_eq!(join.write_mode(), WriteMode::InsertOrIgnore);
    assert!(join.insert_sql(&["person_id", "management_id"]).starts_with("INSERT OR IGNORE"));

    assert_eq!(table("location").unwrap().write_mode(), WriteMode::InsertOrIgnore);
  }

  #[test]
  fn bibliography_family_is_generated() {
    for bib in BiblioType::all() {
      assert!(table(bib.table()).is_ok());
      assert!(table(&bib.person_role_table()).is_ok());
      assert!(table(&bib.management_table()).is_ok());
    }
    let refs = table("occurrence_phd").unwrap();
    assert_eq!(refs.key, ["occurrence_id", "phd_id"]);
    assert!(refs.column("page_start").unwrap().prunable);
    assert!(table("phd").unwrap().column("forthcoming").is_some());
    assert!(table("article").unwrap().column("journal_issue_id").is_some());
    assert_eq!(prunable_tables().count(), 7 * 4);
  }

  #[test]
  fn pruned_copy_keeps_key_columns() {
    let refs = table("type_book").unwrap();
    let ddl = refs.create_sql_as("type_book_tmp", |c| c.name != "image");
    assert!(ddl.contains("type_id INTEGER NOT NULL"));
    assert!(ddl.contains("PRIMARY KEY (type_id, book_id)"));
    assert!(!ddl.contains("image"));
  }

  #[test]
  fn unknown_tables_are_rejected() {
    assert!(matches!(table("persons"), Err(Error::UnknownTable(_))));
  }
}
