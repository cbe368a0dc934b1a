//! Typed views over document-store sources.
//!
//! Source documents are loosely shaped: ids arrive as numbers or strings,
//! person lists sometimes arrive as a single object, and optional fields may
//! be null or missing altogether. The deserialisers here absorb all of that so
//! the pipeline only sees `Option`s and `Vec`s.

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{Error, Result, role::ROLE_FIELDS};

/// A raw document as returned by the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub id:     String,
  pub source: Value,
}

impl Document {
  pub fn new(id: impl Into<String>, source: Value) -> Self {
    Self {
      id: id.into(),
      source,
    }
  }

  pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
    T::deserialize(&self.source).map_err(|source| Error::Document {
      id: self.id.clone(),
      source,
    })
  }
}

// ─── Lenient field deserialisers ─────────────────────────────────────────────

fn value_to_i64(value: &Value) -> Option<i64> {
  match value {
    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn value_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Array(items) => {
      let parts: Vec<String> = items.iter().filter_map(value_to_string).collect();
      (!parts.is_empty()).then(|| parts.join("\n"))
    }
    _ => None,
  }
}

fn value_to_bool(value: &Value) -> Option<bool> {
  match value {
    Value::Bool(b) => Some(*b),
    Value::Number(n) => n.as_i64().map(|n| n != 0),
    Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
      "true" | "t" | "1" | "yes" => Some(true),
      "false" | "f" | "0" | "no" => Some(false),
      _ => None,
    },
    _ => None,
  }
}

pub fn de_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
  Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_to_i64))
}

pub fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
  Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_to_string))
}

pub fn de_opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
  Ok(Option::<Value>::deserialize(d)?.as_ref().and_then(value_to_bool))
}

/// Accepts `null`, a single value, or a list of values.
pub fn de_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  let items = match Option::<Value>::deserialize(d)? {
    None | Some(Value::Null) => return Ok(Vec::new()),
    Some(Value::Array(items)) => items,
    Some(single) => vec![single],
  };
  items
    .into_iter()
    .filter(|v| !v.is_null())
    .map(|v| T::deserialize(v).map_err(serde::de::Error::custom))
    .collect()
}

fn de_id_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
  let values: Vec<Value> = de_list(d)?;
  Ok(values.iter().filter_map(value_to_i64).collect())
}

fn de_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
  let values: Vec<Value> = de_list(d)?;
  Ok(values.iter().filter_map(value_to_string).collect())
}

// ─── Shared shapes ───────────────────────────────────────────────────────────

/// An `{id, name}` object as embedded in documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedRef {
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub id:   Option<i64>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub name: Option<String>,
}

/// An object of which only the id matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdRef {
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub id: Option<i64>,
}

/// A person referenced from a role field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRef {
  pub role:      &'static str,
  pub person_id: i64,
}

/// Collects person references from the role fields of a document.
///
/// Entries without a usable id are skipped.
pub fn role_refs(fields: &Map<String, Value>) -> Vec<RoleRef> {
  let mut refs = Vec::new();
  for (field, role) in ROLE_FIELDS {
    let persons = match fields.get(*field) {
      Some(Value::Array(items)) => items.iter().collect(),
      Some(single @ Value::Object(_)) => vec![single],
      _ => continue,
    };
    for person in persons {
      let id = match person {
        Value::Object(obj) => obj.get("id").and_then(value_to_i64),
        other => value_to_i64(other),
      };
      if let Some(person_id) = id {
        refs.push(RoleRef {
          role: *role,
          person_id,
        });
      }
    }
  }
  refs
}

// ─── Collections ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerseDoc {
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub id:         Option<i64>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub verse:      Option<String>,
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub order:      Option<i64>,
  #[serde(default)]
  pub occurrence: Option<IdRef>,
  #[serde(default)]
  pub manuscript: Option<IdRef>,
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub group_id:   Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonDoc {
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub id:               Option<i64>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub name:             Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub created:          Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub modified:         Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub public_comment:   Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub private_comment:  Option<String>,
  #[serde(default, deserialize_with = "de_list")]
  pub management:       Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub acknowledgement:  Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub self_designation: Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub office:           Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_string_list")]
  pub viaf:             Vec<String>,
  #[serde(default, deserialize_with = "de_string_list")]
  pub plre:             Vec<String>,
  #[serde(default, deserialize_with = "de_string_list")]
  pub pbw:              Vec<String>,
}

impl PersonDoc {
  /// External identifiers as `(type, value)` pairs.
  pub fn identifications(&self) -> Vec<(&'static str, String)> {
    let viaf = self.viaf.iter().map(|v| ("viaf", v.clone()));
    let plre = self.plre.iter().map(|v| ("plre", v.clone()));
    let pbw = self.pbw.iter().map(|v| ("pbw", v.clone()));
    viaf.chain(plre).chain(pbw).collect()
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManuscriptDoc {
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub id:                    Option<i64>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub name:                  Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub shelf:                 Option<String>,
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub completion_floor:      Option<i64>,
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub completion_ceiling:    Option<i64>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub created:               Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub modified:              Option<String>,
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub number_of_occurrences: Option<i64>,
  #[serde(default)]
  pub collection:            Option<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub content:               Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_string_list")]
  pub diktyon:               Vec<String>,
  #[serde(default, deserialize_with = "de_list")]
  pub management:            Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub acknowledgement:       Vec<NamedRef>,
  /// Everything else, including the role fields.
  #[serde(flatten)]
  pub rest:                  Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceDoc {
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub id:                   Option<i64>,
  #[serde(default)]
  pub manuscript:           Option<IdRef>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub created:              Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub modified:             Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub public_comment:       Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub private_comment:      Option<String>,
  #[serde(default, deserialize_with = "de_opt_bool")]
  pub dbbe:                 Option<bool>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub incipit:              Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub text_stemmer:         Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub text_original:        Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub location:             Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub date_floor_year:      Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub date_ceiling_year:    Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub palaeographical_info: Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub contextual_info:      Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub title_original:       Option<String>,
  #[serde(default, deserialize_with = "de_list")]
  pub subject:              Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub genre:                Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub metre:                Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub management:           Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub acknowledgement:      Vec<NamedRef>,
  #[serde(default)]
  pub text_status:          Option<NamedRef>,
  #[serde(flatten)]
  pub rest:                 Map<String, Value>,
}

/// An occurrence embedded in a type document; only its verses are used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeOccurrenceDoc {
  #[serde(default, deserialize_with = "de_list")]
  pub verse: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeDoc {
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub id:              Option<i64>,
  #[serde(default, deserialize_with = "de_opt_bool")]
  pub public:          Option<bool>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub text_stemmer:    Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub text_original:   Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub lemma:           Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub incipit:         Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub created:         Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub modified:        Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub public_comment:  Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub private_comment: Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub title_original:  Option<String>,
  #[serde(default, deserialize_with = "de_list")]
  pub tag:             Vec<NamedRef>,
  #[serde(default)]
  pub critical_status: Option<NamedRef>,
  #[serde(default)]
  pub text_status:     Option<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub subject:         Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub genre:           Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub metre:           Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub management:      Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_list")]
  pub acknowledgement: Vec<NamedRef>,
  #[serde(default, deserialize_with = "de_id_list")]
  pub occurrence_ids:  Vec<i64>,
  #[serde(default, deserialize_with = "de_list")]
  pub occurrence:      Vec<TypeOccurrenceDoc>,
  #[serde(flatten)]
  pub rest:            Map<String, Value>,
}

impl TypeDoc {
  /// Verse count derived from the embedded occurrences.
  pub fn embedded_verse_count(&self) -> Option<i64> {
    let count: usize = self.occurrence.iter().map(|o| o.verse.len()).sum();
    (count > 0).then_some(count as i64)
  }
}

/// Only the visibility of a type document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeVisibilityDoc {
  #[serde(default, deserialize_with = "de_opt_i64")]
  pub id:     Option<i64>,
  #[serde(default, deserialize_with = "de_opt_bool")]
  pub public: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BiblioTitleDoc {
  #[serde(default, deserialize_with = "de_opt_string")]
  pub title:          Option<String>,
  #[serde(default, deserialize_with = "de_opt_string")]
  pub title_sort_key: Option<String>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn ids_accept_numbers_and_strings() {
    let doc = Document::new(
      "1",
      json!({"id": "42", "verse": "αβγ", "order": 3, "occurrence": {"id": 7}}),
    );
    let verse: VerseDoc = doc.parse().unwrap();
    assert_eq!(verse.id, Some(42));
    assert_eq!(verse.order, Some(3));
    assert_eq!(verse.occurrence.and_then(|o| o.id), Some(7));
    assert_eq!(verse.group_id, None);
  }

  #[test]
  fn lists_accept_single_objects_and_null() {
    let doc = Document::new(
      "5",
      json!({
        "id": 5,
        "management": {"id": 1, "name": "checked"},
        "office": null,
        "viaf": ["123"],
        "pbw": "9"
      }),
    );
    let person: PersonDoc = doc.parse().unwrap();
    assert_eq!(person.management, vec![NamedRef {
      id:   Some(1),
      name: Some("checked".into()),
    }]);
    assert!(person.office.is_empty());
    assert_eq!(person.identifications(), vec![("viaf", "123".into()), ("pbw", "9".into())]);
  }

  #[test]
  fn role_fields_collect_people_but_not_content() {
    let doc = Document::new(
      "3",
      json!({
        "id": 3,
        "content": [{"id": 11, "name": "Poetry"}],
        "scribe": [{"id": 100, "name": "A"}, {"id": "101"}],
        "patron": {"id": 102},
        "owner": [{"name": "no id"}]
      }),
    );
    let ms: ManuscriptDoc = doc.parse().unwrap();
    assert_eq!(ms.content.len(), 1);
    let refs = role_refs(&ms.rest);
    assert_eq!(refs, vec![
      RoleRef { role: "Patron", person_id: 102 },
      RoleRef { role: "Scribe", person_id: 100 },
      RoleRef { role: "Scribe", person_id: 101 },
    ]);
  }

  #[test]
  fn type_verse_count_falls_back_to_embedded_verses() {
    let doc = Document::new(
      "8",
      json!({"id": 8, "occurrence": [{"verse": ["a", "b"]}, {"verse": ["c"]}]}),
    );
    let ty: TypeDoc = doc.parse().unwrap();
    assert_eq!(ty.embedded_verse_count(), Some(3));
    assert_eq!(TypeDoc::default().embedded_verse_count(), None);
  }

  #[test]
  fn visibility_ignores_the_rest_of_a_type() {
    let doc = Document::new("9", json!({"id": "9", "public": "false", "occurrence": "junk"}));
    let vis: TypeVisibilityDoc = doc.parse().unwrap();
    assert_eq!((vis.id, vis.public), (Some(9), Some(false)));
  }

  #[test]
  fn malformed_documents_carry_their_id() {
    let doc = Document::new("x", json!({"occurrence": "not an object"}));
    let err = doc.parse::<VerseDoc>().unwrap_err();
    assert!(matches!(err, Error::Document { ref id, .. } if id == "x"));
  }
}
