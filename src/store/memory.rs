//! In-process backend for `memory://` urls. Records live in insertion order per collection.

use super::{value_eq, Backend, Document, ListQuery, ID_KEY};
use crate::error::AppError;
use crate::schema::PersistenceSchema;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Persistence("memory store lock poisoned".into())
}

fn has_id(doc: &Document, id: &str) -> bool {
    doc.get(ID_KEY).and_then(|v| v.as_str()) == Some(id)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ensure_collection(&self, schema: &PersistenceSchema) -> Result<(), AppError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections.entry(schema.collection.clone()).or_default();
        Ok(())
    }

    async fn insert(
        &self,
        schema: &PersistenceSchema,
        doc: Document,
    ) -> Result<Document, AppError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(schema.collection.clone())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(
        &self,
        schema: &PersistenceSchema,
        id: &str,
    ) -> Result<Option<Document>, AppError> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(&schema.collection)
            .and_then(|docs| docs.iter().find(|d| has_id(d, id)))
            .cloned())
    }

    async fn update(
        &self,
        schema: &PersistenceSchema,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, AppError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let Some(doc) = collections
            .get_mut(&schema.collection)
            .and_then(|docs| docs.iter_mut().find(|d| has_id(d, id)))
        else {
            return Ok(None);
        };
        for (k, v) in patch {
            doc.insert(k, v);
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, schema: &PersistenceSchema, id: &str) -> Result<bool, AppError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let Some(docs) = collections.get_mut(&schema.collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| !has_id(d, id));
        Ok(docs.len() < before)
    }

    async fn list(
        &self,
        schema: &PersistenceSchema,
        query: &ListQuery,
    ) -> Result<Vec<Document>, AppError> {
        let collections = self.collections.read().map_err(poisoned)?;
        let Some(docs) = collections.get(&schema.collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|d| {
                query.filters.iter().all(|(k, v)| {
                    let actual = d.get(k).unwrap_or(&serde_json::Value::Null);
                    value_eq(actual, v)
                })
            })
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, ModelDefinitionConfig};
    use crate::schema::PersistenceSchemaBuilder;
    use serde_json::json;

    fn schema() -> PersistenceSchema {
        PersistenceSchemaBuilder::build(
            &ModelDefinitionConfig::new("Note").field("n", FieldConfig::new("number")),
        )
        .unwrap()
    }

    fn note(id: &str, n: f64) -> Document {
        json!({"id": id, "n": n}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn list_filters_and_pages_in_insertion_order() {
        let store = MemoryBackend::new();
        let schema = schema();
        for (i, n) in [1.0, 2.0, 1.0, 1.0].into_iter().enumerate() {
            store.insert(&schema, note(&i.to_string(), n)).await.unwrap();
        }
        let query = ListQuery {
            filters: vec![("n".into(), json!(1))],
            limit: 2,
            offset: 1,
        };
        let ids: Vec<_> = store
            .list(&schema, &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["id"].clone())
            .collect();
        assert_eq!(ids, [json!("2"), json!("3")]);
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let store = MemoryBackend::new();
        let schema = schema();
        let query = ListQuery { limit: 10, ..Default::default() };
        assert!(store.list(&schema, &query).await.unwrap().is_empty());
        assert!(!store.delete(&schema, "nope").await.unwrap());
        assert!(store.update(&schema, "nope", Document::new()).await.unwrap().is_none());
    }
}
