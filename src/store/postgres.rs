//! PostgreSQL backend over a sqlx pool. One table per collection.

use super::{Backend, Document, ListQuery};
use crate::error::{AppError, StartupError};
use crate::schema::{PersistenceSchema, StorageType};
use crate::sql::{self, columns, Column, QueryBuf};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StartupError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| StartupError::Connect(e.to_string()))?;
        Ok(PgBackend { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        PgBackend { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_optional(
        &self,
        schema: &PersistenceSchema,
        q: &QueryBuf,
    ) -> Result<Option<Document>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let row = query.fetch_optional(&self.pool).await?;
        row.map(|r| row_to_document(schema, &r)).transpose()
    }

    async fn fetch_all(
        &self,
        schema: &PersistenceSchema,
        q: &QueryBuf,
    ) -> Result<Vec<Document>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(|r| row_to_document(schema, r)).collect()
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn ensure_collection(&self, schema: &PersistenceSchema) -> Result<(), AppError> {
        let ddl = schema.create_table_sql();
        tracing::debug!(sql = %ddl, "ensure collection");
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(
        &self,
        schema: &PersistenceSchema,
        doc: Document,
    ) -> Result<Document, AppError> {
        let q = sql::insert(schema, &doc);
        self.fetch_optional(schema, &q)
            .await?
            .ok_or_else(|| AppError::Persistence("insert returned no row".into()))
    }

    async fn find_by_id(
        &self,
        schema: &PersistenceSchema,
        id: &str,
    ) -> Result<Option<Document>, AppError> {
        self.fetch_optional(schema, &sql::select_by_id(schema, id)).await
    }

    async fn update(
        &self,
        schema: &PersistenceSchema,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, AppError> {
        self.fetch_optional(schema, &sql::update(schema, id, &patch)).await
    }

    async fn delete(&self, schema: &PersistenceSchema, id: &str) -> Result<bool, AppError> {
        let q = sql::delete(schema, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        schema: &PersistenceSchema,
        query: &ListQuery,
    ) -> Result<Vec<Document>, AppError> {
        self.fetch_all(schema, &sql::select_list(schema, query)).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

fn row_to_document(schema: &PersistenceSchema, row: &PgRow) -> Result<Document, AppError> {
    let mut doc = Document::new();
    for c in columns(schema) {
        let v = cell_to_value(row, &c)?;
        doc.insert(c.key, v);
    }
    Ok(doc)
}

fn cell_to_value(row: &PgRow, column: &Column) -> Result<Value, AppError> {
    let name = column.name.as_str();
    Ok(match column.storage_type {
        StorageType::Text | StorageType::Reference { .. } => {
            row.try_get::<Option<String>, _>(name)?.map(Value::String).unwrap_or(Value::Null)
        }
        StorageType::Double => row
            .try_get::<Option<f64>, _>(name)?
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        StorageType::Boolean => row
            .try_get::<Option<bool>, _>(name)?
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        StorageType::Timestamp => row
            .try_get::<Option<chrono::DateTime<Utc>>, _>(name)?
            .map(|d| Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)))
            .unwrap_or(Value::Null),
        StorageType::Array(_) => row.try_get::<Option<Value>, _>(name)?.unwrap_or(Value::Null),
    })
}
