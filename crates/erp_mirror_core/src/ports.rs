//! Port traits implemented by the storage and upstream adapters.

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::CollectionDescriptor;
use crate::error::Result;
use crate::projection::Projection;
use crate::query::{Filter, Window};
use crate::record::{NaturalKey, Record, StoredDocument};
use crate::user::{NewUser, User};

/// Result of a keyed upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(Uuid),
    Updated(Uuid),
}

impl UpsertOutcome {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }
}

/// Persistence for collection documents.
///
/// Implementations must make `upsert_by_key` atomic: two concurrent upserts
/// for the same natural key never create two documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Fails with `Conflict` if the natural key exists.
    async fn insert(
        &self,
        collection: &CollectionDescriptor,
        fields: Record,
    ) -> Result<StoredDocument>;

    async fn find_by_id(
        &self,
        collection: &CollectionDescriptor,
        id: Uuid,
    ) -> Result<Option<StoredDocument>>;

    async fn count(&self, collection: &CollectionDescriptor, filter: &Filter) -> Result<u64>;

    /// Matching documents in insertion order, projected and windowed.
    async fn find(
        &self,
        collection: &CollectionDescriptor,
        filter: &Filter,
        projection: Option<&Projection>,
        window: Option<Window>,
    ) -> Result<Vec<StoredDocument>>;

    /// Set the given fields on an existing document. `None` if absent.
    async fn update_by_id(
        &self,
        collection: &CollectionDescriptor,
        id: Uuid,
        fields: Record,
    ) -> Result<Option<StoredDocument>>;

    /// Returns false if no document had that identity.
    async fn delete_by_id(&self, collection: &CollectionDescriptor, id: Uuid) -> Result<bool>;

    /// Replace the record of the document with this natural key, or insert it.
    async fn upsert_by_key(
        &self,
        collection: &CollectionDescriptor,
        key: &NaturalKey,
        fields: Record,
    ) -> Result<UpsertOutcome>;
}

/// Persistence for application users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` if the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Login credentials for the ERP service layer.
#[derive(Clone)]
pub struct UpstreamCredentials {
    pub user_name: String,
    pub password: String,
    pub company_db: String,
}

impl std::fmt::Debug for UpstreamCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamCredentials")
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .field("company_db", &self.company_db)
            .finish()
    }
}

/// Opaque, short-lived upstream session token. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential(***)")
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Fails with `Authentication` when the upstream rejects the login or the
    /// call itself fails. No retry.
    async fn authenticate(&self, credentials: &UpstreamCredentials) -> Result<SessionCredential>;
}

#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// One GET against `endpoint` (path plus query, relative to the service
    /// root). Returns an empty vec when the upstream has no records.
    async fn fetch(&self, session: &SessionCredential, endpoint: &str) -> Result<Vec<Record>>;
}
