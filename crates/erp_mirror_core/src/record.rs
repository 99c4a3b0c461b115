//! Records, stored documents and natural keys.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{MirrorError, Result};
use crate::projection::Projection;

/// A record as declared by a schema: field name to JSON value.
pub type Record = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// The persisted form of a record plus storage identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub fields: Record,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    pub fn new(fields: Record) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Render as the client-facing JSON object.
    ///
    /// `_id` is always present. With a projection, only the selected fields
    /// (and timestamps, if selected) are emitted.
    pub fn render(&self, projection: Option<&Projection>) -> Value {
        let mut out = Map::new();
        out.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));

        match projection {
            None => {
                out.extend(self.fields.clone());
                out.insert(CREATED_AT_FIELD.to_string(), timestamp(self.created_at));
                out.insert(UPDATED_AT_FIELD.to_string(), timestamp(self.updated_at));
            }
            Some(projection) => {
                for name in projection.fields() {
                    match name.as_str() {
                        ID_FIELD => {}
                        CREATED_AT_FIELD => {
                            out.insert(name.clone(), timestamp(self.created_at));
                        }
                        UPDATED_AT_FIELD => {
                            out.insert(name.clone(), timestamp(self.updated_at));
                        }
                        _ => {
                            if let Some(value) = self.fields.get(name) {
                                out.insert(name.clone(), value.clone());
                            }
                        }
                    }
                }
            }
        }

        Value::Object(out)
    }
}

impl Serialize for StoredDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.render(None).serialize(serializer)
    }
}

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Canonical text form of a natural-key value.
///
/// Upstream keys arrive as strings or integers; both canonicalize to the
/// same text so `5` and `5.0` address one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey(String);

impl NaturalKey {
    pub fn from_record(record: &Record, field: &str) -> Result<Self> {
        let value = record.get(field).unwrap_or(&Value::Null);
        Self::from_value(value)
            .ok_or_else(|| MirrorError::Validation(format!("{field}: natural key is missing")))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Some(Self(u.to_string()))
                } else {
                    let f = n.as_f64()?;
                    if f.fract() == 0.0 && f.abs() < 9.0e15 {
                        Some(Self((f as i64).to_string()))
                    } else {
                        Some(Self(f.to_string()))
                    }
                }
            }
            Value::Bool(b) => Some(Self(b.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Schema};
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn render_without_projection_includes_metadata() {
        let doc = StoredDocument::new(record(json!({"ItemCode": "A1", "ItemName": "Widget"})));
        let rendered = doc.render(None);
        assert_eq!(rendered["_id"], json!(doc.id.to_string()));
        assert_eq!(rendered["ItemCode"], json!("A1"));
        assert!(rendered.get("createdAt").is_some());
        assert!(rendered.get("updatedAt").is_some());
    }

    #[test]
    fn render_with_projection_keeps_id_and_selected_fields() {
        const FIELDS: &[Field] = &[Field::string("ItemCode"), Field::string("ItemName")];
        const SCHEMA: Schema = Schema::new(FIELDS);
        let projection = Projection::parse(Some("ItemName, createdAt"), &SCHEMA)
            .unwrap()
            .unwrap();
        let doc = StoredDocument::new(record(json!({"ItemCode": "A1", "ItemName": "Widget"})));
        let rendered = doc.render(Some(&projection));
        let keys: Vec<&String> = rendered.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["_id", "ItemName", "createdAt"]);
    }

    #[test]
    fn natural_key_canonicalizes_numbers() {
        assert_eq!(NaturalKey::from_value(&json!(5)).unwrap().as_str(), "5");
        assert_eq!(NaturalKey::from_value(&json!(5.0)).unwrap().as_str(), "5");
        assert_eq!(NaturalKey::from_value(&json!("C001")).unwrap().as_str(), "C001");
    }

    #[test]
    fn natural_key_missing_or_blank_is_validation_error() {
        let r = record(json!({"ItemCode": ""}));
        assert!(matches!(
            NaturalKey::from_record(&r, "ItemCode"),
            Err(MirrorError::Validation(_))
        ));
        assert!(NaturalKey::from_record(&Record::new(), "ItemCode").is_err());
        assert!(NaturalKey::from_value(&json!({"nested": 1})).is_none());
    }
}
