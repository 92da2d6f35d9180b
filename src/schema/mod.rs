//! Schema builders: persistence schema and GraphQL types, both from one validated definition.

pub mod graphql;
pub mod persistence;

pub use graphql::{
    register_shared_types, GraphqlField, GraphqlTypeBuilder, GraphqlTypeDesc, GraphqlTypeSet,
};
pub use persistence::{PersistenceSchema, PersistenceSchemaBuilder, StorageType, StoredField};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_definition, FieldConfig, ModelDefinitionConfig};
    use serde_json::json;

    fn definitions() -> Vec<ModelDefinitionConfig> {
        vec![
            ModelDefinitionConfig::new("Task")
                .field("title", FieldConfig::new("string").required())
                .field("done", FieldConfig::new("boolean").with_default(json!(false))),
            ModelDefinitionConfig::new("Post")
                .field("body", FieldConfig::new("string"))
                .field("published", FieldConfig::new("date").required().with_default(json!("now")))
                .field("tags", FieldConfig::new("array").with_items("string").required())
                .field("score", FieldConfig::new("number").required()),
        ]
    }

    #[test]
    fn builders_agree_on_names_and_nullability() {
        for cfg in definitions() {
            let def = resolve_definition(&cfg).unwrap();
            let storage = PersistenceSchemaBuilder::from_definition(&def);
            let types = GraphqlTypeBuilder::from_definition(&def);

            let stored: Vec<_> = storage.fields.iter().map(|f| f.name.as_str()).collect();
            let exposed: Vec<_> = types
                .object
                .fields
                .iter()
                .map(|f| f.name.as_str())
                .filter(|n| !["id", "createdAt", "updatedAt"].contains(n))
                .collect();
            assert_eq!(stored, exposed, "model {}", def.name);

            for f in &storage.fields {
                let gql = types.object.field(&f.name).unwrap();
                assert_eq!(f.nullable, !gql.non_null, "{}.{}", def.name, f.name);
            }
        }
    }
}
