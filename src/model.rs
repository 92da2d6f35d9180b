//! Compiled models: one definition bound to its collection and GraphQL types.

use crate::config::{resolve_definitions, ModelDefinition, ModelDefinitionConfig};
use crate::error::ConfigError;
use crate::schema::{GraphqlTypeBuilder, GraphqlTypeSet, PersistenceSchemaBuilder};
use crate::store::{Collection, Connection};
use std::collections::HashMap;
use std::sync::Arc;

pub struct CompiledModel {
    pub name: String,
    pub collection: Collection,
    pub graphql: GraphqlTypeSet,
    pub definition: ModelDefinition,
}

impl CompiledModel {
    /// Both schemas come from the same definition.
    pub fn compile(definition: ModelDefinition, connection: &Connection) -> Self {
        let storage = PersistenceSchemaBuilder::from_definition(&definition);
        let graphql = GraphqlTypeBuilder::from_definition(&definition);
        CompiledModel {
            name: definition.name.clone(),
            collection: connection.collection(storage),
            graphql,
            definition,
        }
    }
}

/// Validate and compile every definition in order. Distinct model names must not share a
/// collection.
pub fn compile_models(
    configs: &[ModelDefinitionConfig],
    connection: &Connection,
) -> Result<Vec<Arc<CompiledModel>>, ConfigError> {
    let definitions = resolve_definitions(configs)?;
    let mut owners: HashMap<String, String> = HashMap::new();
    let mut out = Vec::with_capacity(definitions.len());
    for definition in definitions {
        let model = CompiledModel::compile(definition, connection);
        let collection = model.collection.schema().collection.clone();
        match owners.get(&collection) {
            Some(owner) if *owner != model.name => {
                return Err(ConfigError::Validation(format!(
                    "models '{}' and '{}' both map to collection '{}'",
                    owner, model.name, collection
                )));
            }
            _ => {
                owners.insert(collection, model.name.clone());
            }
        }
        tracing::debug!(model = %model.name, "compiled model");
        out.push(Arc::new(model));
    }
    Ok(out)
}
