//! Persistence schema: storage table description derived from a model definition.

use crate::case::to_snake_case;
use crate::config::{
    resolve_definition, DefaultValue, FieldKind, ModelDefinition, ModelDefinitionConfig,
};
use crate::error::ConfigError;
use serde_json::Value;

/// Storage-level column type.
#[derive(Clone, Debug, PartialEq)]
pub enum StorageType {
    Text,
    Double,
    Boolean,
    Timestamp,
    /// Text id of a row in `collection`.
    Reference { collection: String },
    /// Stored as JSON.
    Array(Box<StorageType>),
}

impl StorageType {
    fn from_kind(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::String => StorageType::Text,
            FieldKind::Number => StorageType::Double,
            FieldKind::Boolean => StorageType::Boolean,
            FieldKind::Date => StorageType::Timestamp,
            FieldKind::Reference { model } => StorageType::Reference {
                collection: to_snake_case(model),
            },
            FieldKind::Array(item) => StorageType::Array(Box::new(StorageType::from_kind(item))),
        }
    }

    /// PostgreSQL type name, also used for placeholder casts.
    pub fn pg_type(&self) -> &'static str {
        match self {
            StorageType::Text | StorageType::Reference { .. } => "text",
            StorageType::Double => "double precision",
            StorageType::Boolean => "boolean",
            StorageType::Timestamp => "timestamptz",
            StorageType::Array(_) => "jsonb",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredField {
    pub name: String,
    pub storage_type: StorageType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PersistenceSchema {
    pub model: String,
    pub collection: String,
    pub fields: Vec<StoredField>,
}

pub const ID_COLUMN: &str = "id";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn default_sql(default: &DefaultValue, storage_type: &StorageType) -> String {
    match default {
        DefaultValue::Now => "NOW()".into(),
        DefaultValue::Literal(v) => match (v, storage_type) {
            (_, StorageType::Array(_)) => format!("'{}'::jsonb", v.to_string().replace('\'', "''")),
            (Value::Bool(b), _) => if *b { "TRUE" } else { "FALSE" }.into(),
            (Value::Number(n), _) => n.to_string(),
            (Value::String(s), StorageType::Timestamp) => {
                format!("'{}'::timestamptz", s.replace('\'', "''"))
            }
            (Value::String(s), _) => format!("'{}'", s.replace('\'', "''")),
            (other, _) => format!("'{}'", other.to_string().replace('\'', "''")),
        },
    }
}

impl PersistenceSchema {
    pub fn field(&self, name: &str) -> Option<&StoredField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Idempotent DDL for this collection.
    pub fn create_table_sql(&self) -> String {
        let mut col_defs = vec![format!("{} TEXT PRIMARY KEY", quote(ID_COLUMN))];
        for f in &self.fields {
            let mut def = format!("{} {}", quote(&f.name), f.storage_type.pg_type().to_uppercase());
            if !f.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(ref d) = f.default {
                def.push_str(" DEFAULT ");
                def.push_str(&default_sql(d, &f.storage_type));
            }
            col_defs.push(def);
        }
        for name in [CREATED_AT_COLUMN, UPDATED_AT_COLUMN] {
            col_defs.push(format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quote(name)));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quote(&self.collection),
            col_defs.join(",\n  ")
        )
    }
}

pub struct PersistenceSchemaBuilder;

impl PersistenceSchemaBuilder {
    /// Validate a raw definition and build its persistence schema.
    pub fn build(config: &ModelDefinitionConfig) -> Result<PersistenceSchema, ConfigError> {
        let definition = resolve_definition(config)?;
        Ok(Self::from_definition(&definition))
    }

    pub fn from_definition(definition: &ModelDefinition) -> PersistenceSchema {
        PersistenceSchema {
            model: definition.name.clone(),
            collection: to_snake_case(&definition.name),
            fields: definition
                .fields
                .iter()
                .map(|f| StoredField {
                    name: f.name.clone(),
                    storage_type: StorageType::from_kind(&f.kind),
                    nullable: f.nullable(),
                    default: f.default.clone(),
                })
                .collect(),
        }
    }
}
