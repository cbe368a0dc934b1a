//! PostgreSQL implementation of [`RelationalSource`].
//!
//! Identifiers are cast to `bigint` and dates and free-form numbers to `text`
//! in SQL, so every row decodes into plain Rust scalars regardless of the
//! column types upstream.

use std::time::Duration;

use dbbe_core::{
  biblio::BiblioType,
  entity::EntityKind,
  hierarchy::{HierarchyKind, HierarchyNode},
  record::BiblioDetails,
  source::{
    BiblioManagementRow, BiblioRoleRow, BiblioRow, JournalIssueRow, LibraryRow, LinkRow, NamedRow,
    PersonRow, ReferenceRow, RelationalSource, TypeRelationRow,
  },
};
use sqlx::{
  PgPool, Row,
  postgres::{PgPoolOptions, PgRow},
};
use tracing::debug;

use crate::{Error, Result};

/// Read-only access to the DBBE PostgreSQL database.
///
/// Cheap to clone; the pool is shared.
#[derive(Clone)]
pub struct PgSource {
  pool: PgPool,
}

impl PgSource {
  /// Connects a small pool to `url`.
  pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .acquire_timeout(Duration::from_secs(30))
      .connect(url)
      .await?;
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self { Self { pool } }

  async fn named(&self, sql: &'static str) -> Result<Vec<NamedRow>> {
    let rows: Vec<(i64, Option<String>)> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
    Ok(
      rows
        .into_iter()
        .map(|(id, name)| NamedRow {
          id,
          name: name.unwrap_or_default(),
        })
        .collect(),
    )
  }

  async fn links(&self, sql: &'static str) -> Result<Vec<LinkRow>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
    Ok(
      rows
        .into_iter()
        .map(|(owner_id, member_id)| LinkRow { owner_id, member_id })
        .collect(),
    )
  }

  /// All entries of one bibliography subtype with their detail columns.
  async fn biblio_rows(&self, ty: BiblioType) -> Result<Vec<BiblioRow>> {
    let rows = sqlx::query(biblio_sql(ty)).fetch_all(&self.pool).await?;
    debug!(biblio_type = %ty, rows = rows.len(), "read bibliography rows");

    rows
      .iter()
      .map(|row| -> Result<BiblioRow> {
        Ok(BiblioRow {
          id:              row.try_get("id")?,
          biblio_type:     ty,
          created:         row.try_get("created")?,
          modified:        row.try_get("modified")?,
          public_comment:  row.try_get("public_comment")?,
          private_comment: row.try_get("private_comment")?,
          details:         biblio_details(ty, row)?,
        })
      })
      .collect()
  }
}

// ─── Bibliography SQL ────────────────────────────────────────────────────────

fn biblio_sql(ty: BiblioType) -> &'static str {
  match ty {
    BiblioType::Article => {
      r#"
      SELECT b.identity::bigint AS id, e.created::text AS created, e.modified::text AS modified,
             e.public_comment, e.private_comment
        FROM data.article b
        LEFT JOIN data.entity e ON e.identity = b.identity
      "#
    }
    BiblioType::BlogPost => {
      r#"
      SELECT b.identity::bigint AS id, e.created::text AS created, e.modified::text AS modified,
             e.public_comment, e.private_comment,
             b.url::text AS url, b.post_date::text AS post_date
        FROM data.blog_post b
        LEFT JOIN data.entity e ON e.identity = b.identity
      "#
    }
    BiblioType::Book => {
      r#"
      SELECT b.identity::bigint AS id, e.created::text AS created, e.modified::text AS modified,
             e.public_comment, e.private_comment
        FROM data.book b
        LEFT JOIN data.entity e ON e.identity = b.identity
      "#
    }
    BiblioType::BookChapter => {
      r#"
      SELECT b.identity::bigint AS id, e.created::text AS created, e.modified::text AS modified,
             e.public_comment, e.private_comment
        FROM data.bookchapter b
        LEFT JOIN data.entity e ON e.identity = b.identity
      "#
    }
    BiblioType::OnlineSource => {
      r#"
      SELECT b.identity::bigint AS id, e.created::text AS created, e.modified::text AS modified,
             e.public_comment, e.private_comment,
             b.url::text AS url, b.last_accessed::text AS last_accessed
        FROM data.online_source b
        LEFT JOIN data.entity e ON e.identity = b.identity
      "#
    }
    BiblioType::Phd => {
      r#"
      SELECT b.identity::bigint AS id, e.created::text AS created, e.modified::text AS modified,
             e.public_comment, e.private_comment,
             b.city::text AS city, b.year::text AS year, b.institution::text AS institution,
             b.volume::text AS volume, b.forthcoming AS forthcoming
        FROM data.phd b
        LEFT JOIN data.entity e ON e.identity = b.identity
      "#
    }
    BiblioType::BibVaria => {
      r#"
      SELECT b.identity::bigint AS id, e.created::text AS created, e.modified::text AS modified,
             e.public_comment, e.private_comment,
             b.city::text AS city, b.year::text AS year, b.institution::text AS institution
        FROM data.bib_varia b
        LEFT JOIN data.entity e ON e.identity = b.identity
      "#
    }
  }
}

fn biblio_details(ty: BiblioType, row: &PgRow) -> Result<BiblioDetails> {
  let year = |row: &PgRow| -> Result<Option<i64>> {
    let raw: Option<String> = row.try_get("year")?;
    Ok(raw.and_then(|y| y.trim().parse().ok()))
  };

  Ok(match ty {
    BiblioType::Article | BiblioType::Book | BiblioType::BookChapter => BiblioDetails::None,
    BiblioType::BlogPost => BiblioDetails::BlogPost {
      url:       row.try_get("url")?,
      post_date: row.try_get("post_date")?,
    },
    BiblioType::OnlineSource => BiblioDetails::OnlineSource {
      url:           row.try_get("url")?,
      last_accessed: row.try_get("last_accessed")?,
    },
    BiblioType::Phd => BiblioDetails::Phd {
      city:        row.try_get("city")?,
      year:        year(row)?,
      institution: row.try_get("institution")?,
      volume:      row.try_get("volume")?,
      forthcoming: row.try_get("forthcoming")?,
    },
    BiblioType::BibVaria => BiblioDetails::BibVaria {
      city:        row.try_get("city")?,
      year:        year(row)?,
      institution: row.try_get("institution")?,
    },
  })
}

// ─── RelationalSource impl ───────────────────────────────────────────────────

impl RelationalSource for PgSource {
  type Error = Error;

  async fn hierarchy_node(
    &self,
    hierarchy: HierarchyKind,
    id: i64,
  ) -> Result<Option<HierarchyNode>> {
    let sql = match hierarchy {
      HierarchyKind::Region => {
        r#"
        SELECT identity::bigint AS id, name, historical_name AS alt_name,
               parent_idregion::bigint AS parent_id
          FROM data.region
         WHERE identity = $1
        "#
      }
      HierarchyKind::Content => {
        r#"
        SELECT idgenre::bigint AS id, genre AS name, NULL::text AS alt_name,
               idparentgenre::bigint AS parent_id
          FROM data.genre
         WHERE idgenre = $1
        "#
      }
    };

    let row = sqlx::query(sql).bind(id).fetch_optional(&self.pool).await?;
    row
      .map(|row| -> Result<HierarchyNode> {
        Ok(HierarchyNode {
          id:        row.try_get("id")?,
          name:      row.try_get("name")?,
          alt_name:  row.try_get("alt_name")?,
          parent_id: row.try_get("parent_id")?,
        })
      })
      .transpose()
  }

  async fn content_parents<'a>(&'a self, ids: &'a [i64]) -> Result<Vec<(i64, Option<i64>)>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let rows = sqlx::query_as(
      r#"
      SELECT idgenre::bigint, idparentgenre::bigint
        FROM data.genre
       WHERE idgenre = ANY($1::bigint[])
         AND is_content
      "#,
    )
    .bind(ids)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  async fn persons(&self) -> Result<Vec<PersonRow>> {
    let rows = sqlx::query(
      r#"
      SELECT p.identity::bigint           AS id,
             n.first_name,
             n.last_name,
             born.date::text              AS born,
             died.date::text              AS died,
             COALESCE(p.is_historical, false) AS is_historical,
             COALESCE(p.is_modern, false)     AS is_modern,
             COALESCE(p.is_dbbe, false)       AS is_dbbe,
             orig.idfactoid::bigint       AS origination_fact,
             l.idregion::bigint           AS origination_region
        FROM data.person p
        JOIN data.name n ON n.idperson = p.identity
        LEFT JOIN (
          SELECT f.subject_identity, f.date
            FROM data.factoid f
            JOIN data.factoid_type ft ON ft.idfactoid_type = f.idfactoid_type
           WHERE ft.type = 'born'
        ) born ON born.subject_identity = p.identity
        LEFT JOIN (
          SELECT f.subject_identity, f.date
            FROM data.factoid f
            JOIN data.factoid_type ft ON ft.idfactoid_type = f.idfactoid_type
           WHERE ft.type = 'died'
        ) died ON died.subject_identity = p.identity
        LEFT JOIN (
          SELECT f.idfactoid, f.subject_identity, f.idlocation
            FROM data.factoid f
            JOIN data.factoid_type ft ON ft.idfactoid_type = f.idfactoid_type
           WHERE ft.type = 'origination'
        ) orig ON orig.subject_identity = p.identity
        LEFT JOIN data.location l ON l.idlocation = orig.idlocation
       ORDER BY p.identity,
                n.last_name NULLS LAST,
                n.first_name NULLS LAST,
                born.date::text NULLS LAST,
                died.date::text NULLS LAST,
                orig.idfactoid NULLS LAST
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    rows
      .iter()
      .map(|row| -> Result<PersonRow> {
        Ok(PersonRow {
          id:                 row.try_get("id")?,
          first_name:         row.try_get("first_name")?,
          last_name:          row.try_get("last_name")?,
          born:               row.try_get("born")?,
          died:               row.try_get("died")?,
          is_historical:      row.try_get("is_historical")?,
          is_modern:          row.try_get("is_modern")?,
          is_dbbe:            row.try_get("is_dbbe")?,
          origination_fact:   row.try_get("origination_fact")?,
          origination_region: row.try_get("origination_region")?,
        })
      })
      .collect()
  }

  async fn self_designations(&self) -> Result<Vec<NamedRow>> {
    self
      .named("SELECT id::bigint, name FROM data.self_designation")
      .await
  }

  async fn person_self_designations(&self) -> Result<Vec<LinkRow>> {
    self
      .links(
        "SELECT idperson::bigint, idself_designation::bigint FROM data.person_self_designation",
      )
      .await
  }

  async fn offices(&self) -> Result<Vec<NamedRow>> {
    self
      .named("SELECT idoccupation::bigint, occupation FROM data.occupation")
      .await
  }

  async fn person_offices(&self) -> Result<Vec<LinkRow>> {
    self
      .links("SELECT idperson::bigint, idoccupation::bigint FROM data.person_occupation")
      .await
  }

  async fn manuscript_library(&self, manuscript_id: i64) -> Result<Option<LibraryRow>> {
    let row: Option<(i64, Option<String>, Option<i64>)> = sqlx::query_as(
      r#"
      SELECT DISTINCT i.identity::bigint, i.name, i.idregion::bigint
        FROM data.located_at la
        JOIN data.location l    ON la.idlocation = l.idlocation
        JOIN data.fund f        ON l.idfund = f.idfund
        JOIN data.institution i ON f.idlibrary = i.identity
       WHERE la.iddocument = $1
       LIMIT 1
      "#,
    )
    .bind(manuscript_id)
    .fetch_optional(&self.pool)
    .await?;

    Ok(row.map(|(id, name, region_id)| LibraryRow { id, name, region_id }))
  }

  async fn written_regions(&self, manuscript_id: i64) -> Result<Vec<i64>> {
    let rows: Vec<(Option<i64>,)> = sqlx::query_as(
      r#"
      SELECT DISTINCT l.idregion::bigint
        FROM data.factoid f
        JOIN data.factoid_type ft ON f.idfactoid_type = ft.idfactoid_type
        JOIN data.location l      ON l.idlocation = f.idlocation
       WHERE f.subject_identity = $1
         AND ft.type = 'written'
      "#,
    )
    .bind(manuscript_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows.into_iter().filter_map(|(region,)| region).collect())
  }

  async fn related_occurrences(&self) -> Result<Vec<(i64, i64)>> {
    let rows = sqlx::query_as(
      r#"
      SELECT a.idoriginal_poem::bigint, b.idoriginal_poem::bigint
        FROM data.original_poem_verse a
        JOIN data.original_poem_verse b ON a.idgroup = b.idgroup
       WHERE a.idoriginal_poem < b.idoriginal_poem
      UNION
      SELECT fa.subject_identity::bigint, fb.subject_identity::bigint
        FROM data.factoid fa
        JOIN data.factoid_type fta ON fa.idfactoid_type = fta.idfactoid_type
        JOIN data.factoid fb       ON fa.object_identity = fb.object_identity
        JOIN data.factoid_type ftb ON fb.idfactoid_type = ftb.idfactoid_type
       WHERE fta.type = 'reconstruction of'
         AND ftb.type = 'reconstruction of'
         AND fa.subject_identity < fb.subject_identity
      "#,
    )
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  async fn subject_keywords(&self) -> Result<Vec<NamedRow>> {
    self
      .named("SELECT identity::bigint, keyword FROM data.keyword WHERE is_subject")
      .await
  }

  async fn poem_verse_counts(&self) -> Result<Vec<(i64, i64)>> {
    let rows: Vec<(i64, Option<i64>)> =
      sqlx::query_as("SELECT identity::bigint, verses::bigint FROM data.poem")
        .fetch_all(&self.pool)
        .await?;
    Ok(
      rows
        .into_iter()
        .filter_map(|(id, verses)| verses.map(|v| (id, v)))
        .collect(),
    )
  }

  async fn type_relations(&self) -> Result<Vec<TypeRelationRow>> {
    let rows: Vec<(i64, i64, i64, String)> = sqlx::query_as(
      r#"
      SELECT f.subject_identity::bigint, f.object_identity::bigint,
             ft.idfactoid_type::bigint, ft.type
        FROM data.factoid f
        JOIN data.factoid_type ft ON f.idfactoid_type = ft.idfactoid_type
       WHERE ft."group" = 'reconstructed_poem_related_to_reconstructed_poem'
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(type_id, related_type_id, definition_id, definition)| TypeRelationRow {
          type_id,
          related_type_id,
          definition_id,
          definition,
        })
        .collect(),
    )
  }

  async fn bibliographies(&self) -> Result<Vec<BiblioRow>> {
    let mut all = Vec::new();
    for ty in BiblioType::all() {
      all.extend(self.biblio_rows(ty).await?);
    }
    Ok(all)
  }

  async fn entity_kinds(&self) -> Result<Vec<(i64, EntityKind)>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
      r#"
      SELECT identity::bigint, 'manuscript' FROM data.manuscript
      UNION ALL
      SELECT identity::bigint, 'occurrence' FROM data.original_poem
      UNION ALL
      SELECT identity::bigint, 'type'       FROM data.reconstructed_poem
      UNION ALL
      SELECT identity::bigint, 'person'     FROM data.person
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    rows
      .into_iter()
      .map(|(id, kind)| -> Result<(i64, EntityKind)> {
        let parsed = kind
          .parse::<EntityKind>()
          .map_err(|_| dbbe_core::Error::UnknownEntityKind(kind))?;
        Ok((id, parsed))
      })
      .collect()
  }

  async fn references(&self) -> Result<Vec<ReferenceRow>> {
    let rows = sqlx::query(
      r#"
      SELECT idsource::bigint AS biblio_id, idtarget::bigint AS target_id,
             page_start::text AS page_start, page_end::text AS page_end,
             url, source_remark, image
        FROM data.reference
       ORDER BY idsource, idtarget
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    rows
      .iter()
      .map(|row| -> Result<ReferenceRow> {
        Ok(ReferenceRow {
          biblio_id:     row.try_get("biblio_id")?,
          target_id:     row.try_get("target_id")?,
          page_start:    row.try_get("page_start")?,
          page_end:      row.try_get("page_end")?,
          url:           row.try_get("url")?,
          source_remark: row.try_get("source_remark")?,
          image:         row.try_get("image")?,
        })
      })
      .collect()
  }

  async fn journals(&self) -> Result<Vec<NamedRow>> {
    self
      .named(
        r#"
        SELECT j.identity::bigint, dt.title
          FROM data.journal j
          JOIN data.document_title dt ON dt.iddocument = j.identity
        "#,
      )
      .await
  }

  async fn journal_issues(&self) -> Result<Vec<JournalIssueRow>> {
    let rows = sqlx::query(
      r#"
      SELECT identity::bigint AS id, idjournal::bigint AS journal_id,
             year::text AS year, series::text AS series, volume::text AS volume,
             number::text AS number, COALESCE(forthcoming, false) AS forthcoming
        FROM data.journal_issue
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    rows
      .iter()
      .map(|row| -> Result<JournalIssueRow> {
        Ok(JournalIssueRow {
          id:          row.try_get("id")?,
          journal_id:  row.try_get("journal_id")?,
          year:        row.try_get("year")?,
          series:      row.try_get("series")?,
          volume:      row.try_get("volume")?,
          number:      row.try_get("number")?,
          forthcoming: row.try_get("forthcoming")?,
        })
      })
      .collect()
  }

  async fn biblio_containers(&self) -> Result<Vec<LinkRow>> {
    self
      .links("SELECT idcontainer::bigint, idcontent::bigint FROM data.document_contains")
      .await
  }

  async fn biblio_roles(&self) -> Result<Vec<BiblioRoleRow>> {
    let rows: Vec<(i64, i64, String)> = sqlx::query_as(
      r#"
      SELECT br.iddocument::bigint, br.idperson::bigint, r.name
        FROM data.bibrole br
        JOIN data.role r ON r.idrole = br.idrole
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(biblio_id, person_id, role)| BiblioRoleRow {
          biblio_id,
          person_id,
          role,
        })
        .collect(),
    )
  }

  async fn biblio_managements(&self) -> Result<Vec<BiblioManagementRow>> {
    let rows: Vec<(i64, i64, Option<String>)> = sqlx::query_as(
      r#"
      SELECT em.identity::bigint, m.id::bigint, m.name
        FROM data.entity_management em
        JOIN data.management m ON m.id = em.idmanagement
      "#,
    )
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(biblio_id, id, name)| BiblioManagementRow {
          biblio_id,
          management: NamedRow {
            id,
            name: name.unwrap_or_default(),
          },
        })
        .collect(),
    )
  }
}
