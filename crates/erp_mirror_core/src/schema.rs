//! Statically declared record schemas.
//!
//! Every collection declares its fields up front; nothing is discovered by
//! reflecting over stored data. Validation is strict: undeclared fields are
//! dropped, declared fields are coerced where the conversion is lossless,
//! and required fields must be present and non-empty. Records mirrored from
//! upstream are only type-checked; their natural key is enforced separately.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::error::{MirrorError, Result};
use crate::record::{Record, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};

/// Value kind of a declared field.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// RFC 3339 timestamp, stored normalized to UTC with millisecond precision.
    Date,
    Object(&'static [Field]),
    ObjectArray(&'static [Field]),
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Object(_) => "object",
            FieldKind::ObjectArray(_) => "array of objects",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    pub const fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub const fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub const fn object(name: &'static str, fields: &'static [Field]) -> Self {
        Self::new(name, FieldKind::Object(fields))
    }

    pub const fn object_array(name: &'static str, fields: &'static [Field]) -> Self {
        Self::new(name, FieldKind::ObjectArray(fields))
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }
}

/// How much of the schema a payload must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Every required field must be present (create).
    Full,
    /// Only fields present in the payload are checked (update).
    Partial,
    /// Types are checked but no field is required (upstream upsert).
    /// Blank values are stored as null.
    Upsert,
}

impl ValidationMode {
    /// Mode applied to the fields of nested objects.
    fn nested(self) -> Self {
        match self {
            Self::Upsert => Self::Upsert,
            Self::Full | Self::Partial => Self::Full,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    fields: &'static [Field],
}

impl Schema {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names a client may project: declared fields plus storage metadata.
    pub fn allowed_fields(&self) -> Vec<&'static str> {
        let mut allowed: Vec<&'static str> = self.fields.iter().map(|f| f.name).collect();
        allowed.extend([ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD]);
        allowed
    }

    pub fn is_allowed_field(&self, name: &str) -> bool {
        self.field(name).is_some() || matches!(name, ID_FIELD | CREATED_AT_FIELD | UPDATED_AT_FIELD)
    }

    /// Validate a JSON payload against this schema and return the cleaned record.
    pub fn validate(&self, input: &Value, mode: ValidationMode) -> Result<Record> {
        let Some(object) = input.as_object() else {
            return Err(MirrorError::Validation(
                "request body must be a JSON object".to_string(),
            ));
        };

        let mut problems = Vec::new();
        let record = validate_object(self.fields, object, mode, "", &mut problems);

        if problems.is_empty() {
            Ok(record)
        } else {
            Err(MirrorError::Validation(problems.join("; ")))
        }
    }

    /// Cast a raw query-string value to the declared kind of `field`.
    ///
    /// Returns `Ok(None)` for undeclared fields; those filters can never match
    /// a stored document because validation drops undeclared fields.
    pub fn cast_filter_value(&self, field: &str, raw: &str) -> Result<Option<Value>> {
        let Some(declared) = self.field(field) else {
            return Ok(None);
        };
        let cast = match declared.kind {
            FieldKind::String => Some(Value::String(raw.to_string())),
            FieldKind::Number => parse_number(raw).map(Value::Number),
            FieldKind::Boolean => parse_bool(raw).map(Value::Bool),
            FieldKind::Date => normalize_date(raw).map(Value::String),
            FieldKind::Object(_) | FieldKind::ObjectArray(_) => None,
        };
        cast.map(Some).ok_or_else(|| {
            MirrorError::Validation(format!(
                "cannot filter {field} by {raw:?}: expected {}",
                declared.kind.describe()
            ))
        })
    }
}

fn validate_object(
    fields: &'static [Field],
    input: &Map<String, Value>,
    mode: ValidationMode,
    prefix: &str,
    problems: &mut Vec<String>,
) -> Record {
    let mut out = Record::new();

    for field in fields {
        let path = format!("{prefix}{}", field.name);
        match input.get(field.name) {
            None => {
                if field.required && mode == ValidationMode::Full {
                    problems.push(format!("{path}: is required"));
                }
            }
            Some(value) if is_blank(value) => {
                if field.required && mode != ValidationMode::Upsert {
                    problems.push(format!("{path}: is required"));
                } else {
                    out.insert(field.name.to_string(), Value::Null);
                }
            }
            Some(value) => {
                if let Some(coerced) = coerce(field.kind, value, mode.nested(), &path, problems) {
                    out.insert(field.name.to_string(), coerced);
                }
            }
        }
    }

    out
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn coerce(
    kind: FieldKind,
    value: &Value,
    nested_mode: ValidationMode,
    path: &str,
    problems: &mut Vec<String>,
) -> Option<Value> {
    let coerced = match (kind, value) {
        (FieldKind::String, Value::String(_)) => Some(value.clone()),
        (FieldKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (FieldKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (FieldKind::Number, Value::Number(_)) => Some(value.clone()),
        (FieldKind::Number, Value::String(s)) => parse_number(s).map(Value::Number),
        (FieldKind::Number, Value::Bool(b)) => Some(Value::Number(Number::from(u8::from(*b)))),

        (FieldKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (FieldKind::Boolean, Value::String(s)) => parse_bool(s).map(Value::Bool),
        (FieldKind::Boolean, Value::Number(n)) => match n.as_f64() {
            Some(x) if x == 0.0 => Some(Value::Bool(false)),
            Some(x) if x == 1.0 => Some(Value::Bool(true)),
            _ => None,
        },

        (FieldKind::Date, Value::String(s)) => normalize_date(s).map(Value::String),

        (FieldKind::Object(fields), Value::Object(inner)) => Some(Value::Object(validate_object(
            fields,
            inner,
            nested_mode,
            &format!("{path}."),
            problems,
        ))),

        (FieldKind::ObjectArray(fields), Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(inner) => out.push(Value::Object(validate_object(
                        fields,
                        inner,
                        nested_mode,
                        &format!("{path}.{i}."),
                        problems,
                    ))),
                    None => problems.push(format!("{path}.{i}: expected object")),
                }
            }
            Some(Value::Array(out))
        }
        // A lone object where an array is declared is wrapped.
        (FieldKind::ObjectArray(fields), Value::Object(inner)) => {
            Some(Value::Array(vec![Value::Object(validate_object(
                fields,
                inner,
                nested_mode,
                &format!("{path}.0."),
                problems,
            ))]))
        }

        _ => None,
    };

    if coerced.is_none() {
        problems.push(format!("{path}: expected {}", kind.describe()));
    }
    coerced
}

fn parse_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Number::from(i));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let parsed: DateTime<Utc> = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        naive.and_utc()
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)?.and_utc()
    } else {
        return None;
    };
    Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}
