//! List-query parsing: pagination, projection and equality filters.

use serde_json::Value;
use uuid::Uuid;

use crate::error::{MirrorError, Result};
use crate::record::{StoredDocument, ID_FIELD};
use crate::schema::Schema;

const PAGE_PARAM: &str = "page";
const PER_PAGE_PARAM: &str = "per_page";
const SELECT_PARAM: &str = "select";

/// Raw list query as received from the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub select: Option<String>,
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    /// Build from query-string pairs. When a key repeats, the last value wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut deduped: Vec<(String, String)> = Vec::new();
        for (key, value) in pairs {
            let (key, value) = (key.into(), value.into());
            match deduped.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => deduped.push((key, value)),
            }
        }

        let mut query = ListQuery::default();
        for (key, value) in deduped {
            match key.as_str() {
                PAGE_PARAM => query.page = parse_positive_int(&value),
                PER_PAGE_PARAM => query.per_page = parse_positive_int(&value),
                SELECT_PARAM => query.select = Some(value),
                _ => query.filters.push((key, value)),
            }
        }
        query
    }

    /// Paginated mode requires both `page` and `per_page`.
    pub fn paging(&self) -> Option<Paging> {
        match (self.page, self.per_page) {
            (Some(page), Some(per_page)) => Some(Paging { page, per_page }),
            _ => None,
        }
    }
}

/// Leading-integer parse: `"2"` and `"2abc"` give 2; non-numeric, zero and
/// negative values are treated as unset.
pub fn parse_positive_int(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if unsigned.starts_with('-') {
        return None;
    }
    let digits: String = unsigned.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<u64>().ok().filter(|n| *n > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: u64,
    pub per_page: u64,
}

impl Paging {
    pub fn window(&self) -> Window {
        Window {
            skip: (self.page - 1).saturating_mul(self.per_page),
            limit: self.per_page,
        }
    }

    pub fn summarize(&self, total: u64) -> Pagination {
        Pagination {
            total,
            total_pages: total.div_ceil(self.per_page),
            current_page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Skip/limit window in natural (insertion) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub per_page: u64,
}

/// One equality condition against a stored document.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Id(Uuid),
    Field { name: String, value: Value },
}

/// Conjunction of equality conditions. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Cast raw query pairs into typed conditions using the schema.
    pub fn from_params(params: &[(String, String)], schema: &Schema) -> Result<Self> {
        let mut conditions = Vec::with_capacity(params.len());
        for (name, raw) in params {
            if name == ID_FIELD {
                let id = Uuid::parse_str(raw.trim()).map_err(|_| {
                    MirrorError::Validation(format!("cannot filter {ID_FIELD} by {raw:?}"))
                })?;
                conditions.push(Condition::Id(id));
                continue;
            }
            let value = schema
                .cast_filter_value(name, raw)?
                .unwrap_or_else(|| Value::String(raw.clone()));
            conditions.push(Condition::Field {
                name: name.clone(),
                value,
            });
        }
        Ok(Self { conditions })
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, doc: &StoredDocument) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Id(id) => doc.id == *id,
            Condition::Field { name, value } => doc
                .fields
                .get(name)
                .is_some_and(|stored| value_matches(stored, value)),
        })
    }
}

/// Equality with numeric normalization; arrays match if any element does.
pub fn value_matches(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(items), _) if !wanted.is_array() => {
            items.iter().any(|item| value_matches(item, wanted))
        }
        _ => stored == wanted,
    }
}
