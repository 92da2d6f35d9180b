//! Persistence handles: the `Backend` trait, a connect-later `Connection`, and per-model
//! `Collection`s.

mod memory;
mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

use crate::config::DefaultValue;
use crate::error::{AppError, StartupError};
use crate::schema::{PersistenceSchema, StorageType};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// A stored record as a JSON object. Keys are field names plus `id`, `createdAt`, `updatedAt`.
pub type Document = serde_json::Map<String, Value>;

pub const ID_KEY: &str = "id";
pub const CREATED_AT_KEY: &str = "createdAt";
pub const UPDATED_AT_KEY: &str = "updatedAt";

/// Exact-match filters plus paging. Results are ordered by creation.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub filters: Vec<(String, Value)>,
    pub limit: u32,
    pub offset: u32,
}

/// Storage engine behind every collection. Documents passed in are already normalized.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn ensure_collection(&self, schema: &PersistenceSchema) -> Result<(), AppError>;
    async fn insert(&self, schema: &PersistenceSchema, doc: Document) -> Result<Document, AppError>;
    async fn find_by_id(
        &self,
        schema: &PersistenceSchema,
        id: &str,
    ) -> Result<Option<Document>, AppError>;
    /// Merge `patch` into the record; None when `id` does not exist.
    async fn update(
        &self,
        schema: &PersistenceSchema,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, AppError>;
    /// True when a record was removed.
    async fn delete(&self, schema: &PersistenceSchema, id: &str) -> Result<bool, AppError>;
    async fn list(
        &self,
        schema: &PersistenceSchema,
        query: &ListQuery,
    ) -> Result<Vec<Document>, AppError>;
    async fn ping(&self) -> Result<(), AppError>;
}

#[derive(Clone, Debug)]
pub struct ConnectOptions {
    pub timeout: Duration,
    pub max_connections: u32,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            timeout: Duration::from_secs(30),
            max_connections: 5,
        }
    }
}

/// Process-wide database connection. Collections can be bound before it is connected;
/// operations on an unconnected handle fail with a persistence error.
#[derive(Clone, Default)]
pub struct Connection {
    backend: Arc<OnceLock<Arc<dyn Backend>>>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the backend named by the url scheme, bounded by `options.timeout`.
    pub async fn connect(&self, url: &str, options: &ConnectOptions) -> Result<(), StartupError> {
        if self.is_connected() {
            return Err(StartupError::AlreadyConnected);
        }
        let scheme = url.split("://").next().unwrap_or_default().to_lowercase();
        tracing::info!(scheme = %scheme, "connecting to database");
        let backend: Arc<dyn Backend> = match scheme.as_str() {
            "postgres" | "postgresql" => {
                let connect = PgBackend::connect(url, options.max_connections, options.timeout);
                let pg = tokio::time::timeout(options.timeout, connect)
                    .await
                    .map_err(|_| StartupError::ConnectTimeout(options.timeout))??;
                Arc::new(pg)
            }
            "memory" => Arc::new(MemoryBackend::new()),
            _ => return Err(StartupError::UnsupportedDatabase(scheme)),
        };
        self.attach(backend)
    }

    /// Install an already-open backend.
    pub fn attach(&self, backend: Arc<dyn Backend>) -> Result<(), StartupError> {
        self.backend
            .set(backend)
            .map_err(|_| StartupError::AlreadyConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.backend.get().is_some()
    }

    pub fn backend(&self) -> Result<&Arc<dyn Backend>, AppError> {
        self.backend
            .get()
            .ok_or_else(|| AppError::Persistence("database not connected".into()))
    }

    pub fn collection(&self, schema: PersistenceSchema) -> Collection {
        Collection {
            schema: Arc::new(schema),
            connection: self.clone(),
        }
    }
}

/// One model's persistence handle. Applies defaults, assigns ids and timestamps,
/// and normalizes values before handing documents to the backend.
#[derive(Clone)]
pub struct Collection {
    schema: Arc<PersistenceSchema>,
    connection: Connection,
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Collection {
    pub fn schema(&self) -> &PersistenceSchema {
        &self.schema
    }

    pub async fn ensure(&self) -> Result<(), AppError> {
        self.connection.backend()?.ensure_collection(&self.schema).await
    }

    pub async fn insert(&self, input: Document) -> Result<Document, AppError> {
        let mut doc = Document::new();
        for f in &self.schema.fields {
            let value = match input.get(&f.name) {
                Some(v) if !v.is_null() => Some(normalize(&f.storage_type, v)?),
                _ => match &f.default {
                    Some(DefaultValue::Literal(v)) => Some(normalize(&f.storage_type, v)?),
                    Some(DefaultValue::Now) => Some(Value::String(now_string())),
                    None => None,
                },
            };
            match value {
                Some(v) => {
                    doc.insert(f.name.clone(), v);
                }
                None if !f.nullable => {
                    return Err(AppError::Validation(format!("{} is required", f.name)));
                }
                None => {
                    doc.insert(f.name.clone(), Value::Null);
                }
            }
        }
        let now = now_string();
        doc.insert(ID_KEY.into(), Value::String(uuid::Uuid::new_v4().to_string()));
        doc.insert(CREATED_AT_KEY.into(), Value::String(now.clone()));
        doc.insert(UPDATED_AT_KEY.into(), Value::String(now));
        tracing::debug!(collection = %self.schema.collection, "insert");
        self.connection.backend()?.insert(&self.schema, doc).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Document>, AppError> {
        self.connection.backend()?.find_by_id(&self.schema, id).await
    }

    pub async fn update(&self, id: &str, patch: Document) -> Result<Option<Document>, AppError> {
        let mut doc = Document::new();
        for (k, v) in patch {
            let f = self
                .schema
                .field(&k)
                .ok_or_else(|| AppError::Validation(format!("unknown field '{}'", k)))?;
            if v.is_null() {
                if !f.nullable {
                    return Err(AppError::Validation(format!("{} cannot be null", k)));
                }
                doc.insert(k, Value::Null);
            } else {
                let v = normalize(&f.storage_type, &v)?;
                doc.insert(k, v);
            }
        }
        doc.insert(UPDATED_AT_KEY.into(), Value::String(now_string()));
        tracing::debug!(collection = %self.schema.collection, id = %id, "update");
        self.connection.backend()?.update(&self.schema, id, doc).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        tracing::debug!(collection = %self.schema.collection, id = %id, "delete");
        self.connection.backend()?.delete(&self.schema, id).await
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Document>, AppError> {
        let mut normalized = query.clone();
        for (k, v) in normalized.filters.iter_mut() {
            let f = self
                .schema
                .field(k)
                .ok_or_else(|| AppError::Validation(format!("unknown filter field '{}'", k)))?;
            if !v.is_null() {
                *v = normalize(&f.storage_type, v)?;
            }
        }
        self.connection.backend()?.list(&self.schema, &normalized).await
    }
}

/// Canonical stored form: numbers as f64, dates as RFC 3339 UTC with milliseconds.
pub fn normalize(storage_type: &StorageType, v: &Value) -> Result<Value, AppError> {
    match (storage_type, v) {
        (StorageType::Double, Value::Number(n)) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| AppError::Validation(format!("invalid number {}", n))),
        (StorageType::Timestamp, Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|d| {
                Value::String(
                    d.with_timezone(&Utc)
                        .to_rfc3339_opts(SecondsFormat::Millis, true),
                )
            })
            .map_err(|_| AppError::Validation(format!("invalid date '{}'", s))),
        (StorageType::Array(item), Value::Array(items)) => items
            .iter()
            .map(|i| normalize(item, i))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (_, v) => Ok(v.clone()),
    }
}

/// Loose equality used for exact-match filters: numbers compare as f64.
pub(crate) fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}
