//! Field projection for read operations.
//!
//! A client sends `select=a,b,c`; every name must be a declared field of the
//! collection (or one of the storage metadata fields). All invalid names are
//! reported together alongside the allowed list.

use crate::error::{MirrorError, Result};
use crate::record::Record;
use crate::schema::Schema;

/// Validated field inclusion list. `None` at call sites means "all fields".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Parse and validate a comma-separated `select` value.
    ///
    /// Absent, empty, or all-blank selections yield `Ok(None)`.
    pub fn parse(select: Option<&str>, schema: &Schema) -> Result<Option<Self>> {
        let Some(select) = select else {
            return Ok(None);
        };

        let requested: Vec<String> = select
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        if requested.is_empty() {
            return Ok(None);
        }

        let invalid_fields: Vec<String> = requested
            .iter()
            .filter(|f| !schema.is_allowed_field(f))
            .cloned()
            .collect();

        if !invalid_fields.is_empty() {
            return Err(MirrorError::InvalidField {
                invalid_fields,
                allowed_fields: schema
                    .allowed_fields()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        }

        let mut fields = Vec::with_capacity(requested.len());
        for f in requested {
            if !fields.contains(&f) {
                fields.push(f);
            }
        }
        Ok(Some(Self { fields }))
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn includes(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    /// Keep only the selected record fields.
    pub fn apply(&self, record: &Record) -> Record {
        self.fields
            .iter()
            .filter_map(|f| record.get(f).map(|v| (f.clone(), v.clone())))
            .collect()
    }
}

/// Space-delimited inclusion spec, e.g. `ItemCode ItemName`.
impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fields.join(" "))
    }
}
