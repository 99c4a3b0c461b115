//! In-process stores backed by `tokio::sync::RwLock`.
//!
//! Used by the test suites and by `MIRROR_STORE=memory`. Documents live in a
//! `Vec` per collection so iteration order is insertion order.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::catalog::CollectionDescriptor;
use crate::error::{MirrorError, Result};
use crate::ports::{DocumentStore, UpsertOutcome, UserStore};
use crate::projection::Projection;
use crate::query::{Filter, Window};
use crate::record::{NaturalKey, Record, StoredDocument};
use crate::user::{NewUser, User};

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<&'static str, Vec<StoredDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key_of(collection: &CollectionDescriptor, doc: &StoredDocument) -> Option<NaturalKey> {
    doc.fields
        .get(collection.natural_key)
        .and_then(NaturalKey::from_value)
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(
        &self,
        collection: &CollectionDescriptor,
        fields: Record,
    ) -> Result<StoredDocument> {
        let key = NaturalKey::from_record(&fields, collection.natural_key)?;
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.name).or_default();
        if docs
            .iter()
            .any(|d| key_of(collection, d).as_ref() == Some(&key))
        {
            return Err(MirrorError::Conflict(format!(
                "{} {} already exists",
                collection.natural_key, key
            )));
        }
        let doc = StoredDocument::new(fields);
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(
        &self,
        collection: &CollectionDescriptor,
        id: Uuid,
    ) -> Result<Option<StoredDocument>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection.name)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn count(&self, collection: &CollectionDescriptor, filter: &Filter) -> Result<u64> {
        let guard = self.collections.read().await;
        let count = guard
            .get(collection.name)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find(
        &self,
        collection: &CollectionDescriptor,
        filter: &Filter,
        projection: Option<&Projection>,
        window: Option<Window>,
    ) -> Result<Vec<StoredDocument>> {
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(collection.name) else {
            return Ok(Vec::new());
        };
        let (skip, limit) = match window {
            Some(w) => (w.skip as usize, w.limit as usize),
            None => (0, usize::MAX),
        };
        Ok(docs
            .iter()
            .filter(|d| filter.matches(d))
            .skip(skip)
            .take(limit)
            .map(|d| match projection {
                Some(p) => StoredDocument {
                    fields: p.apply(&d.fields),
                    ..d.clone()
                },
                None => d.clone(),
            })
            .collect())
    }

    async fn update_by_id(
        &self,
        collection: &CollectionDescriptor,
        id: Uuid,
        fields: Record,
    ) -> Result<Option<StoredDocument>> {
        let mut guard = self.collections.write().await;
        let Some(doc) = guard
            .get_mut(collection.name)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(None);
        };
        doc.fields.extend(fields);
        doc.updated_at = Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn delete_by_id(&self, collection: &CollectionDescriptor, id: Uuid) -> Result<bool> {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection.name) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }

    async fn upsert_by_key(
        &self,
        collection: &CollectionDescriptor,
        key: &NaturalKey,
        fields: Record,
    ) -> Result<UpsertOutcome> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.name).or_default();
        if let Some(doc) = docs
            .iter_mut()
            .find(|d| key_of(collection, d).as_ref() == Some(key))
        {
            doc.fields = fields;
            doc.updated_at = Utc::now();
            return Ok(UpsertOutcome::Updated(doc.id));
        }
        let doc = StoredDocument::new(fields);
        let id = doc.id;
        docs.push(doc);
        Ok(UpsertOutcome::Inserted(id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(MirrorError::Conflict("Email already registered".into()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}
