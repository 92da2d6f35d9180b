//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a persistence schema.

use super::PgBindValue;
use crate::case::to_camel_case;
use crate::schema::persistence::{CREATED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN};
use crate::schema::{PersistenceSchema, StorageType};
use crate::store::{Document, ListQuery};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from definitions).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// One storage column and the document key it maps to.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub key: String,
    pub storage_type: StorageType,
}

/// All columns in select order: id, declared fields, timestamps.
pub fn columns(schema: &PersistenceSchema) -> Vec<Column> {
    let system = |name: &str, storage_type: StorageType| Column {
        name: name.to_string(),
        key: to_camel_case(name),
        storage_type,
    };
    let mut out = vec![system(ID_COLUMN, StorageType::Text)];
    out.extend(schema.fields.iter().map(|f| Column {
        name: f.name.clone(),
        key: f.name.clone(),
        storage_type: f.storage_type.clone(),
    }));
    out.push(system(CREATED_AT_COLUMN, StorageType::Timestamp));
    out.push(system(UPDATED_AT_COLUMN, StorageType::Timestamp));
    out
}

fn column_for_key(schema: &PersistenceSchema, key: &str) -> Option<Column> {
    columns(schema).into_iter().find(|c| c.key == key)
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its placeholder, cast to the column type.
    fn push_param(&mut self, column: &Column, v: &Value) -> String {
        self.params.push(PgBindValue::for_column(&column.storage_type, v));
        format!("${}::{}", self.params.len(), column.storage_type.pg_type())
    }
}

fn table(schema: &PersistenceSchema) -> String {
    quoted(&schema.collection)
}

fn select_column_list(schema: &PersistenceSchema) -> String {
    columns(schema)
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn id_column() -> Column {
    Column {
        name: ID_COLUMN.into(),
        key: ID_COLUMN.into(),
        storage_type: StorageType::Text,
    }
}

/// INSERT every known key present in the document; RETURNING the full row.
pub fn insert(schema: &PersistenceSchema, doc: &Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in columns(schema) {
        let Some(v) = doc.get(&c.key) else { continue };
        placeholders.push(q.push_param(&c, v));
        cols.push(quoted(&c.name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table(schema),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(schema)
    );
    q
}

pub fn select_by_id(schema: &PersistenceSchema, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(&id_column(), &Value::String(id.to_string()));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(schema),
        table(schema),
        quoted(ID_COLUMN),
        ph
    );
    q
}

/// UPDATE by id: SET only keys present in the patch that map to a column.
pub fn update(schema: &PersistenceSchema, id: &str, patch: &Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in patch {
        if k == ID_COLUMN {
            continue;
        }
        let Some(c) = column_for_key(schema, k) else { continue };
        let ph = q.push_param(&c, v);
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    if sets.is_empty() {
        sets.push(format!("{} = NOW()", quoted(UPDATED_AT_COLUMN)));
    }
    let id_ph = q.push_param(&id_column(), &Value::String(id.to_string()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table(schema),
        sets.join(", "),
        quoted(ID_COLUMN),
        id_ph,
        select_column_list(schema)
    );
    q
}

pub fn delete(schema: &PersistenceSchema, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(&id_column(), &Value::String(id.to_string()));
    q.sql = format!("DELETE FROM {} WHERE {} = {}", table(schema), quoted(ID_COLUMN), ph);
    q
}

/// SELECT with exact-match filters, ordered by creation, with LIMIT/OFFSET.
pub fn select_list(schema: &PersistenceSchema, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (k, v) in &query.filters {
        let Some(c) = column_for_key(schema, k) else { continue };
        if v.is_null() {
            where_parts.push(format!("{} IS NULL", quoted(&c.name)));
        } else {
            let ph = q.push_param(&c, v);
            where_parts.push(format!("{} = {}", quoted(&c.name), ph));
        }
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}, {} LIMIT {} OFFSET {}",
        select_column_list(schema),
        table(schema),
        where_clause,
        quoted(CREATED_AT_COLUMN),
        quoted(ID_COLUMN),
        query.limit,
        query.offset
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, ModelDefinitionConfig};
    use crate::schema::PersistenceSchemaBuilder;
    use serde_json::json;

    fn schema() -> PersistenceSchema {
        let cfg = ModelDefinitionConfig::new("Task")
            .field("title", FieldConfig::new("string").required())
            .field("done", FieldConfig::new("boolean"));
        PersistenceSchemaBuilder::build(&cfg).unwrap()
    }

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_casts_every_placeholder() {
        let row = doc(json!({"id": "a", "title": "x", "createdAt": "2024-01-01T00:00:00.000Z"}));
        let q = insert(&schema(), &row);
        assert_eq!(
            q.sql,
            "INSERT INTO \"task\" (\"id\", \"title\", \"created_at\") VALUES ($1::text, $2::text, $3::timestamptz) \
             RETURNING \"id\", \"done\", \"title\", \"created_at\", \"updated_at\""
        );
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn update_maps_timestamp_keys_and_binds_id_last() {
        let patch = doc(json!({"done": true, "updatedAt": "2024-01-01T00:00:00.000Z"}));
        let q = update(&schema(), "a", &patch);
        assert!(q.sql.starts_with(
            "UPDATE \"task\" SET \"done\" = $1::boolean, \"updated_at\" = $2::timestamptz WHERE \"id\" = $3::text"
        ));
        assert_eq!(q.params[2], PgBindValue::Text("a".into()));
    }

    #[test]
    fn list_filters_and_pages() {
        let query = ListQuery {
            filters: vec![("done".into(), json!(false)), ("title".into(), Value::Null)],
            limit: 10,
            offset: 5,
        };
        let q = select_list(&schema(), &query);
        assert!(q.sql.ends_with(
            "FROM \"task\" WHERE \"done\" = $1::boolean AND \"title\" IS NULL ORDER BY \"created_at\", \"id\" LIMIT 10 OFFSET 5"
        ));
        assert_eq!(q.params, vec![PgBindValue::Bool(false)]);
    }

    #[test]
    fn delete_by_id() {
        let q = delete(&schema(), "a");
        assert_eq!(q.sql, "DELETE FROM \"task\" WHERE \"id\" = $1::text");
    }
}
