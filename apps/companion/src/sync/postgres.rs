//! PostgreSQL-backed document store and anonymous auth.
//!
//! Documents live in one `documents` table keyed by (collection path, id) with
//! a JSONB body, which is enough to express the `users/{uid}` profile document
//! and the append-only `users/{uid}/journal` and `users/{uid}/checkins`
//! collections.

use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::remote::{
    merge_fields, split_document_path, validate_field_name, AuthProvider, Direction, Document,
    DocumentStore, Fields, Identity, RemoteError,
};

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    fields: Json<Fields>,
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_document(&self, path: &str) -> Result<Option<Fields>, RemoteError> {
        let (collection, id) = split_document_path(path)?;
        let fields: Option<Json<Fields>> =
            sqlx::query_scalar("SELECT fields FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(fields.map(|Json(fields)| fields))
    }

    async fn set_document(
        &self,
        path: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), RemoteError> {
        let (collection, id) = split_document_path(path)?;
        let mut tx = self.pool.begin().await?;

        let body = if merge {
            let existing: Option<Json<Fields>> = sqlx::query_scalar(
                "SELECT fields FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
            )
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
            let mut body = existing.map(|Json(f)| f).unwrap_or_default();
            merge_fields(&mut body, fields);
            body
        } else {
            fields
        };

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET fields = EXCLUDED.fields, saved_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&body))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Wrote document {path} (merge: {merge})");
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, RemoteError> {
        let id = Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&fields))
            .execute(&self.pool)
            .await?;
        debug!("Appended document {collection}/{id}");
        Ok(id)
    }

    async fn query_collection(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<Document>, RemoteError> {
        validate_field_name(order_by)?;
        let order = match direction {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        };
        let sql = format!(
            "SELECT id, fields FROM documents WHERE collection = $1 \
             ORDER BY fields -> $2 {order} NULLS LAST, saved_at {order} LIMIT $3"
        );
        let rows: Vec<DocumentRow> = sqlx::query_as(&sql)
            .bind(collection)
            .bind(order_by)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Document {
                id: row.id,
                fields: row.fields.0,
            })
            .collect())
    }
}

/// Issues anonymous identities recorded in the `identities` table. The
/// signed-in identity is process-wide, like a single device session.
pub struct PgAuthProvider {
    pool: PgPool,
    current: RwLock<Option<Identity>>,
}

impl PgAuthProvider {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            current: RwLock::new(None),
        }
    }

    fn set_current(&self, identity: Identity) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(identity);
        }
    }
}

#[async_trait]
impl AuthProvider for PgAuthProvider {
    async fn sign_in_anonymously(&self) -> Result<Identity, RemoteError> {
        let uid = Uuid::new_v4();
        sqlx::query("INSERT INTO identities (uid, anonymous) VALUES ($1, TRUE)")
            .bind(uid)
            .execute(&self.pool)
            .await?;

        let identity = Identity {
            uid: uid.to_string(),
            anonymous: true,
        };
        info!("Issued anonymous identity {}", identity.uid);
        self.set_current(identity.clone());
        Ok(identity)
    }

    async fn resume(&self, identity: &Identity) -> Result<bool, RemoteError> {
        let Ok(uid) = Uuid::parse_str(&identity.uid) else {
            return Ok(false);
        };
        let known: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM identities WHERE uid = $1)")
                .bind(uid)
                .fetch_one(&self.pool)
                .await?;
        if known {
            self.set_current(identity.clone());
        }
        Ok(known)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.read().ok().and_then(|current| current.clone())
    }
}
