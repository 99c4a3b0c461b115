//! Generic record handler: create / read-one / read-all / update / remove
//! over any collection in the catalog.
//!
//! One `RecordHandler<C>` is instantiated per collection type at startup.
//! It holds no per-request state; all state lives in the document store.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::{Collection, CollectionDescriptor};
use crate::error::{MirrorError, Result};
use crate::ports::DocumentStore;
use crate::projection::Projection;
use crate::query::{Filter, ListQuery, Pagination};
use crate::record::NaturalKey;
use crate::schema::ValidationMode;
use crate::user::{require_caller, Principal};

/// Operation being served, used to label server-side faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOp {
    Create,
    ReadAll,
    ReadOne,
    Update,
    Remove,
}

impl RecordOp {
    pub fn describe(&self) -> &'static str {
        match self {
            RecordOp::Create => "creating",
            RecordOp::ReadAll => "fetching all",
            RecordOp::ReadOne => "fetching single record",
            RecordOp::Update => "updating",
            RecordOp::Remove => "deleting",
        }
    }
}

/// Result of `read_all`: a page with its summary, or the bare document list.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ListResponse {
    Page {
        data: Vec<Value>,
        pagination: Pagination,
    },
    All(Vec<Value>),
}

pub struct RecordHandler<C: Collection> {
    store: Arc<dyn DocumentStore>,
    _collection: PhantomData<fn() -> C>,
}

impl<C: Collection> Clone for RecordHandler<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _collection: PhantomData,
        }
    }
}

impl<C: Collection> RecordHandler<C> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _collection: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &'static CollectionDescriptor {
        C::descriptor()
    }

    pub async fn create(&self, body: &Value) -> Result<Value> {
        let desc = C::descriptor();
        let fields = desc.schema.validate(body, ValidationMode::Full)?;
        // Required by every schema, but checked here so the store never sees a keyless record.
        NaturalKey::from_record(&fields, desc.natural_key)?;
        let doc = self.store.insert(desc, fields).await?;
        tracing::debug!(collection = desc.name, id = %doc.id, "record created");
        Ok(doc.render(None))
    }

    pub async fn read_one(&self, id: &str) -> Result<Value> {
        let desc = C::descriptor();
        let id = parse_id(id)?;
        self.store
            .find_by_id(desc, id)
            .await?
            .map(|doc| doc.render(None))
            .ok_or_else(not_found)
    }

    /// List documents with optional paging, projection and equality filters.
    ///
    /// When the filters match nothing, they are discarded and the query runs
    /// against the whole collection instead. Paged responses then report the
    /// unfiltered total.
    pub async fn read_all(&self, query: &ListQuery) -> Result<ListResponse> {
        let desc = C::descriptor();
        let projection = Projection::parse(query.select.as_deref(), &desc.schema)?;
        let mut filter = Filter::from_params(&query.filters, &desc.schema)?;

        if let Some(paging) = query.paging() {
            let mut total = self.store.count(desc, &filter).await?;
            if total == 0 && !filter.is_empty() {
                tracing::debug!(collection = desc.name, "no matches for filters, listing all");
                filter = Filter::all();
                total = self.store.count(desc, &filter).await?;
            }
            let docs = self
                .store
                .find(desc, &filter, projection.as_ref(), Some(paging.window()))
                .await?;
            return Ok(ListResponse::Page {
                data: docs.iter().map(|d| d.render(projection.as_ref())).collect(),
                pagination: paging.summarize(total),
            });
        }

        let mut docs = self
            .store
            .find(desc, &filter, projection.as_ref(), None)
            .await?;
        if docs.is_empty() && !filter.is_empty() {
            tracing::debug!(collection = desc.name, "no matches for filters, listing all");
            docs = self
                .store
                .find(desc, &Filter::all(), projection.as_ref(), None)
                .await?;
        }
        Ok(ListResponse::All(
            docs.iter().map(|d| d.render(projection.as_ref())).collect(),
        ))
    }

    pub async fn update(&self, caller: Option<&Principal>, id: &str, body: &Value) -> Result<Value> {
        let caller = require_caller(caller)?;
        let desc = C::descriptor();
        let id = parse_id(id)?;
        let existing = self
            .store
            .find_by_id(desc, id)
            .await?
            .ok_or_else(not_found)?;
        let fields = desc.schema.validate(body, ValidationMode::Partial)?;

        if let Some(new_key) = fields.get(desc.natural_key) {
            let current = existing
                .fields
                .get(desc.natural_key)
                .and_then(NaturalKey::from_value);
            if NaturalKey::from_value(new_key) != current {
                return Err(MirrorError::Validation(format!(
                    "{}: natural key cannot be changed",
                    desc.natural_key
                )));
            }
        }

        let doc = self
            .store
            .update_by_id(desc, id, fields)
            .await?
            .ok_or_else(not_found)?;
        tracing::debug!(collection = desc.name, %id, user = %caller.user_id, "record updated");
        Ok(doc.render(None))
    }

    pub async fn remove(&self, caller: Option<&Principal>, id: &str) -> Result<()> {
        let caller = require_caller(caller)?;
        let desc = C::descriptor();
        let id = parse_id(id)?;
        if !self.store.delete_by_id(desc, id).await? {
            return Err(not_found());
        }
        tracing::debug!(collection = desc.name, %id, user = %caller.user_id, "record deleted");
        Ok(())
    }
}

fn not_found() -> MirrorError {
    MirrorError::NotFound("Not found".into())
}

/// An id that is not a storage identity cannot match any document.
fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}
