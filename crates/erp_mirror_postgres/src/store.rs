//! Postgres implementations of the erp_mirror_core store ports.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid compile-time DB requirement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use erp_mirror_core::catalog::CollectionDescriptor;
use erp_mirror_core::error::{MirrorError, Result};
use erp_mirror_core::ports::{DocumentStore, UpsertOutcome, UserStore};
use erp_mirror_core::projection::Projection;
use erp_mirror_core::query::{Condition, Filter, Window};
use erp_mirror_core::record::{NaturalKey, Record, StoredDocument};
use erp_mirror_core::user::{NewUser, User};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    body: Json<Record>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        StoredDocument {
            id: row.id,
            fields: row.body.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ── PgDocumentStore ───────────────────────────────────────────

/// All collections share `mirror_documents`, partitioned by the `collection` column.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append `AND ...` clauses for every filter condition.
///
/// Field conditions compare JSONB values, so `100` matches `100.0`. Array
/// fields match when any element equals the value.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, collection: &str, filter: &Filter) {
    qb.push(" WHERE collection = ");
    qb.push_bind(collection.to_string());
    for condition in filter.conditions() {
        match condition {
            Condition::Id(id) => {
                qb.push(" AND id = ");
                qb.push_bind(*id);
            }
            Condition::Field { name, value } => {
                qb.push(" AND (body -> ");
                qb.push_bind(name.clone());
                qb.push(" = ");
                qb.push_bind(Json(value.clone()));
                qb.push(" OR (jsonb_typeof(body -> ");
                qb.push_bind(name.clone());
                qb.push(") = 'array' AND body -> ");
                qb.push_bind(name.clone());
                qb.push(" @> jsonb_build_array(");
                qb.push_bind(Json(value.clone()));
                qb.push(")))");
            }
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(
        &self,
        collection: &CollectionDescriptor,
        fields: Record,
    ) -> Result<StoredDocument> {
        let key = NaturalKey::from_record(&fields, collection.natural_key)?;
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO mirror_documents (collection, id, natural_key, body)
            VALUES ($1, $2, $3, $4)
            RETURNING id, body, created_at, updated_at
            "#,
        )
        .bind(collection.name)
        .bind(Uuid::new_v4())
        .bind(key.as_str())
        .bind(Json(&fields))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MirrorError::Conflict(format!(
                    "{} {} already exists",
                    collection.natural_key, key
                ))
            } else {
                MirrorError::store(e)
            }
        })?;
        Ok(row.into())
    }

    async fn find_by_id(
        &self,
        collection: &CollectionDescriptor,
        id: Uuid,
    ) -> Result<Option<StoredDocument>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, body, created_at, updated_at
            FROM mirror_documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(MirrorError::store)?;
        Ok(row.map(Into::into))
    }

    async fn count(&self, collection: &CollectionDescriptor, filter: &Filter) -> Result<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM mirror_documents");
        push_filter(&mut qb, collection.name, filter);
        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(MirrorError::store)?;
        Ok(count.max(0) as u64)
    }

    async fn find(
        &self,
        collection: &CollectionDescriptor,
        filter: &Filter,
        projection: Option<&Projection>,
        window: Option<Window>,
    ) -> Result<Vec<StoredDocument>> {
        let mut qb = QueryBuilder::new("SELECT id, ");
        match projection {
            Some(p) => {
                qb.push(
                    "(SELECT COALESCE(jsonb_object_agg(key, value), '{}'::jsonb) \
                     FROM jsonb_each(body) WHERE key = ANY(",
                );
                qb.push_bind(p.fields().to_vec());
                qb.push(")) AS body");
            }
            None => {
                qb.push("body");
            }
        }
        qb.push(", created_at, updated_at FROM mirror_documents");
        push_filter(&mut qb, collection.name, filter);
        qb.push(" ORDER BY seq");
        if let Some(w) = window {
            qb.push(" OFFSET ");
            qb.push_bind(i64::try_from(w.skip).unwrap_or(i64::MAX));
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(w.limit).unwrap_or(i64::MAX));
        }

        let rows: Vec<DocumentRow> = qb
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(MirrorError::store)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_by_id(
        &self,
        collection: &CollectionDescriptor,
        id: Uuid,
        fields: Record,
    ) -> Result<Option<StoredDocument>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE mirror_documents
            SET body = body || $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING id, body, created_at, updated_at
            "#,
        )
        .bind(collection.name)
        .bind(id)
        .bind(Json(&fields))
        .fetch_optional(&self.pool)
        .await
        .map_err(MirrorError::store)?;
        Ok(row.map(Into::into))
    }

    async fn delete_by_id(&self, collection: &CollectionDescriptor, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mirror_documents WHERE collection = $1 AND id = $2")
            .bind(collection.name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(MirrorError::store)?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_by_key(
        &self,
        collection: &CollectionDescriptor,
        key: &NaturalKey,
        fields: Record,
    ) -> Result<UpsertOutcome> {
        // xmax = 0 only on the freshly inserted row version.
        let (id, inserted): (Uuid, bool) = sqlx::query_as(
            r#"
            INSERT INTO mirror_documents (collection, id, natural_key, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, natural_key) WHERE natural_key IS NOT NULL
            DO UPDATE SET body = EXCLUDED.body, updated_at = now()
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(collection.name)
        .bind(Uuid::new_v4())
        .bind(key.as_str())
        .bind(Json(&fields))
        .fetch_one(&self.pool)
        .await
        .map_err(MirrorError::store)?;

        Ok(if inserted {
            UpsertOutcome::Inserted(id)
        } else {
            UpsertOutcome::Updated(id)
        })
    }
}

// ── PgUserStore ───────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO mirror_users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                MirrorError::Conflict("Email already registered".into())
            } else {
                MirrorError::store(e)
            }
        })?;
        Ok(row.into())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM mirror_users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(MirrorError::store)?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM mirror_users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(MirrorError::store)?;
        Ok(row.map(Into::into))
    }
}
