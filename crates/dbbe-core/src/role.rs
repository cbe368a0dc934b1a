//! Person-role fields embedded in documents.

/// Document fields carrying person references, with the role name they map
/// to in the output store.
///
/// `content` is absent on purpose: on manuscripts that field holds the content
/// taxonomy, not persons.
pub const ROLE_FIELDS: &[(&str, &str)] = &[
  ("person_subject", "Subject"),
  ("owner", "Owner"),
  ("poet", "Poet"),
  ("patron", "Patron"),
  ("related", "Related"),
  ("scribe", "Scribe"),
  ("author", "Author"),
  ("supervisor", "Supervisor"),
  ("editor", "Editor"),
  ("contributor", "Contributor"),
  ("translator", "Translator"),
  ("transcriber", "Transcriber"),
  ("creator", "Creator"),
  ("illuminator", "Illuminator"),
];

/// Role name for a document field, if the field carries persons.
pub fn role_for_field(field: &str) -> Option<&'static str> {
  ROLE_FIELDS
    .iter()
    .find(|(f, _)| *f == field)
    .map(|(_, role)| *role)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn content_is_not_a_role() {
    assert_eq!(role_for_field("content"), None);
    assert_eq!(role_for_field("person_subject"), Some("Subject"));
    assert_eq!(role_for_field("scribe"), Some("Scribe"));
  }
}
