//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` port from the `core` crate. Each user's document is a
//! JSONB row in PostgreSQL; array union and removal run as single `UPDATE`
//! statements so they are atomic per field without any application-level lock.

use async_trait::async_trait;
use media_lists_core::ports::{DocumentStore, PortError, PortResult, SnapshotStream, UserDocument};
use media_lists_core::snapshots::SnapshotHub;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;

//=========================================================================================
// SQL Statements
//=========================================================================================

const SELECT_DOCUMENT: &str = "SELECT data FROM user_documents WHERE user_id = $1";

const UPSERT_DOCUMENT: &str = "INSERT INTO user_documents (user_id, data) VALUES ($1, $2) \
     ON CONFLICT (user_id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()";

/// Appends `$3` to the array at key `$2` unless an equal element already exists.
const ARRAY_UNION: &str = r#"
UPDATE user_documents
SET data = jsonb_set(
        data,
        ARRAY[$2::text],
        CASE
            WHEN EXISTS (
                SELECT 1 FROM jsonb_array_elements(COALESCE(data -> $2::text, '[]'::jsonb)) AS e(v)
                WHERE e.v = $3::jsonb
            )
            THEN COALESCE(data -> $2::text, '[]'::jsonb)
            ELSE COALESCE(data -> $2::text, '[]'::jsonb) || jsonb_build_array($3::jsonb)
        END,
        true
    ),
    updated_at = now()
WHERE user_id = $1
RETURNING data
"#;

/// Drops every element equal to `$3` from the array at key `$2`, keeping order.
const ARRAY_REMOVE: &str = r#"
UPDATE user_documents
SET data = jsonb_set(
        data,
        ARRAY[$2::text],
        COALESCE(
            (
                SELECT jsonb_agg(e.v ORDER BY e.i)
                FROM jsonb_array_elements(COALESCE(data -> $2::text, '[]'::jsonb))
                     WITH ORDINALITY AS e(v, i)
                WHERE e.v <> $3::jsonb
            ),
            '[]'::jsonb
        ),
        true
    ),
    updated_at = now()
WHERE user_id = $1
RETURNING data
"#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
///
/// Snapshots are fanned out in-process after each committed write, so watchers
/// only see writes made through this instance.
// TODO: publish through LISTEN/NOTIFY so watchers on other instances see every write.
pub struct PgDocumentStore {
    pool: PgPool,
    snapshots: SnapshotHub,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            snapshots: SnapshotHub::default(),
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn update_array(
        &self,
        statement: &str,
        user_id: &str,
        field: &str,
        value: Value,
    ) -> PortResult<()> {
        let updated = sqlx::query_scalar::<_, Json<Value>>(statement)
            .bind(user_id)
            .bind(field)
            .bind(Json(value))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .ok_or_else(|| PortError::NotFound(format!("User document {} not found", user_id)))?;

        let document = into_document(updated.0)?;
        debug!(user_id, field, "Array field updated");
        self.snapshots.publish(user_id, &document);
        Ok(())
    }
}

fn into_document(value: Value) -> PortResult<UserDocument> {
    match value {
        Value::Object(document) => Ok(document),
        other => Err(PortError::Unexpected(format!(
            "Stored user document is not an object: {}",
            other
        ))),
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, user_id: &str) -> PortResult<Option<UserDocument>> {
        let record = sqlx::query_scalar::<_, Json<Value>>(SELECT_DOCUMENT)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(|Json(value)| into_document(value)).transpose()
    }

    async fn set(&self, user_id: &str, document: UserDocument) -> PortResult<()> {
        let value = Value::Object(document);
        sqlx::query(UPSERT_DOCUMENT)
            .bind(user_id)
            .bind(Json(&value))
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if let Value::Object(document) = &value {
            self.snapshots.publish(user_id, document);
        }
        Ok(())
    }

    async fn array_union(&self, user_id: &str, field: &str, value: Value) -> PortResult<()> {
        self.update_array(ARRAY_UNION, user_id, field, value).await
    }

    async fn array_remove(&self, user_id: &str, field: &str, value: Value) -> PortResult<()> {
        self.update_array(ARRAY_REMOVE, user_id, field, value).await
    }

    async fn watch(&self, user_id: &str) -> PortResult<SnapshotStream> {
        Ok(self.snapshots.watch(user_id))
    }
}
