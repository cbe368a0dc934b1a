//! Resolution of untyped bibliography edges to concrete tables.
//!
//! The relational source records references, containment, roles and
//! managements against bare ids. These functions pair each edge with the
//! subtype of its bibliography entry and, for references, the kind of its
//! target. Edges that cannot be resolved are counted and dropped.

use std::collections::{HashMap, HashSet};

use dbbe_core::{
  biblio::BiblioType,
  document::NamedRef,
  entity::EntityKind,
  index::KindIndex,
  record::{BiblioManagementLink, BiblioRoleLink, ContainerLink, ReferenceLink},
  source::{BiblioManagementRow, BiblioRoleRow, LinkRow, ReferenceRow},
};
use tracing::{debug, warn};

/// Resolved edges plus the number of edges that were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
  pub links:   Vec<T>,
  pub skipped: usize,
}

impl<T> Default for Resolved<T> {
  fn default() -> Self {
    Self {
      links:   Vec::new(),
      skipped: 0,
    }
  }
}

/// Builds the id-to-kind index for reference targets and reports every id
/// claimed by more than one kind.
pub fn entity_index(rows: Vec<(i64, EntityKind)>) -> KindIndex<EntityKind> {
  let index = KindIndex::build(rows);
  for conflict in index.conflicts() {
    warn!(
      id = conflict.id,
      kept = %conflict.kept,
      dropped = %conflict.dropped,
      "entity id exists under several kinds"
    );
  }
  index
}

pub fn references(
  rows: Vec<ReferenceRow>,
  biblio_kinds: &HashMap<i64, BiblioType>,
  entities: &KindIndex<EntityKind>,
) -> Resolved<ReferenceLink> {
  let mut out = Resolved::default();
  for row in rows {
    let Some(biblio_type) = biblio_kinds.get(&row.biblio_id).copied() else {
      debug!(
        biblio = row.biblio_id,
        target = row.target_id,
        "reference from unknown bibliography entry"
      );
      out.skipped += 1;
      continue;
    };
    let Some(entity) = entities.get(row.target_id) else {
      debug!(biblio = row.biblio_id, target = row.target_id, "reference to unknown entity");
      out.skipped += 1;
      continue;
    };

    let (page_start, page_end, raw_pages) =
      ReferenceLink::pages(row.page_start.as_deref(), row.page_end.as_deref());
    out.links.push(ReferenceLink {
      entity,
      entity_id: row.target_id,
      biblio_type,
      biblio_id: row.biblio_id,
      page_start,
      page_end,
      raw_pages,
      url: row.url,
      source_remark: row.source_remark,
      image: row.image,
    });
  }
  out
}

/// Points articles at journal issues, chapters at books and blog posts at
/// their blog. Containment rows whose content has no container column are
/// not edges of interest and are ignored without counting.
pub fn containers(
  rows: &[LinkRow],
  biblio_kinds: &HashMap<i64, BiblioType>,
  journal_issues: &HashSet<i64>,
) -> Resolved<ContainerLink> {
  let mut out = Resolved::default();
  for row in rows {
    let (container_id, content_id) = (row.owner_id, row.member_id);
    let Some(biblio_type) = biblio_kinds.get(&content_id).copied() else {
      continue;
    };
    let valid = match biblio_type {
      BiblioType::Article => journal_issues.contains(&container_id),
      BiblioType::BookChapter => biblio_kinds.get(&container_id) == Some(&BiblioType::Book),
      BiblioType::BlogPost => true,
      _ => continue,
    };
    if valid {
      out.links.push(ContainerLink {
        biblio_type,
        content_id,
        container_id,
      });
    } else {
      debug!(%biblio_type, content_id, container_id, "container of unexpected kind");
      out.skipped += 1;
    }
  }
  out
}

pub fn roles(
  rows: Vec<BiblioRoleRow>,
  biblio_kinds: &HashMap<i64, BiblioType>,
) -> Resolved<BiblioRoleLink> {
  let mut out = Resolved::default();
  for row in rows {
    match biblio_kinds.get(&row.biblio_id) {
      Some(&biblio_type) => out.links.push(BiblioRoleLink {
        biblio_type,
        biblio_id: row.biblio_id,
        person_id: row.person_id,
        role: row.role,
      }),
      None => out.skipped += 1,
    }
  }
  out
}

pub fn managements(
  rows: Vec<BiblioManagementRow>,
  biblio_kinds: &HashMap<i64, BiblioType>,
) -> Resolved<BiblioManagementLink> {
  let mut out = Resolved::default();
  // Managements are also attached to non-bibliographic entities; those rows
  // are not skipped edges.
  for row in rows {
    if let Some(&biblio_type) = biblio_kinds.get(&row.biblio_id) {
      out.links.push(BiblioManagementLink {
        biblio_type,
        biblio_id: row.biblio_id,
        management: NamedRef {
          id:   Some(row.management.id),
          name: Some(row.management.name),
        },
      });
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use dbbe_core::source::NamedRow;

  use super::*;

  fn kinds() -> HashMap<i64, BiblioType> {
    HashMap::from([
      (1, BiblioType::Article),
      (2, BiblioType::Book),
      (3, BiblioType::BookChapter),
      (4, BiblioType::BlogPost),
      (5, BiblioType::Phd),
    ])
  }

  fn reference(
    biblio_id: i64,
    target_id: i64,
    start: Option<&str>,
    end: Option<&str>,
  ) -> ReferenceRow {
    ReferenceRow {
      biblio_id,
      target_id,
      page_start: start.map(str::to_owned),
      page_end: end.map(str::to_owned),
      ..ReferenceRow::default()
    }
  }

  #[test]
  fn references_resolve_both_sides() {
    let entities = entity_index(vec![(100, EntityKind::Manuscript), (200, EntityKind::Type)]);
    let out = references(
      vec![
        reference(1, 100, Some("12"), Some("15")),
        reference(5, 200, Some("xii"), None),
        reference(9, 100, None, None),
        reference(1, 999, None, None),
      ],
      &kinds(),
      &entities,
    );

    assert_eq!(out.skipped, 2);
    assert_eq!(out.links.len(), 2);
    assert_eq!(out.links[0].entity, EntityKind::Manuscript);
    assert_eq!(out.links[0].biblio_type, BiblioType::Article);
    assert_eq!((out.links[0].page_start, out.links[0].page_end), (Some(12), Some(15)));
    assert_eq!(out.links[1].entity, EntityKind::Type);
    assert_eq!(out.links[1].raw_pages.as_deref(), Some("xii"));
  }

  #[test]
  fn ambiguous_target_resolves_to_one_kind() {
    let entities = entity_index(vec![(50, EntityKind::Person), (50, EntityKind::Manuscript)]);
    assert_eq!(entities.conflicts().len(), 1);

    let out = references(vec![reference(1, 50, None, None)], &kinds(), &entities);
    assert_eq!(out.links.len(), 1);
    assert_eq!(out.links[0].entity, EntityKind::Manuscript);
  }

  #[test]
  fn containers_check_the_container_kind() {
    let issues = HashSet::from([70]);
    let rows = [
      LinkRow { owner_id: 70, member_id: 1 },
      LinkRow { owner_id: 71, member_id: 1 },
      LinkRow { owner_id: 2, member_id: 3 },
      LinkRow { owner_id: 5, member_id: 3 },
      LinkRow { owner_id: 80, member_id: 4 },
      LinkRow { owner_id: 2, member_id: 5 },
    ];
    let out = containers(&rows, &kinds(), &issues);

    let pairs: Vec<(i64, i64)> = out.links.iter().map(|l| (l.content_id, l.container_id)).collect();
    assert_eq!(pairs, vec![(1, 70), (3, 2), (4, 80)]);
    assert_eq!(out.skipped, 2);
  }

  #[test]
  fn roles_and_managements_need_a_known_entry() {
    let out = roles(
      vec![
        BiblioRoleRow {
          biblio_id: 2,
          person_id: 10,
          role:      "Author".into(),
        },
        BiblioRoleRow {
          biblio_id: 99,
          person_id: 10,
          role:      "Author".into(),
        },
      ],
      &kinds(),
    );
    assert_eq!(out.links.len(), 1);
    assert_eq!(out.skipped, 1);

    let out = managements(
      vec![BiblioManagementRow {
        biblio_id:  4,
        management: NamedRow {
          id:   3,
          name: "checked".into(),
        },
      }],
      &kinds(),
    );
    assert_eq!(out.links[0].biblio_type, BiblioType::BlogPost);
    assert_eq!(out.links[0].management.name.as_deref(), Some("checked"));
  }
}
