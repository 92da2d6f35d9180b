//! Query and mutation root fields collected across all compiled models.

use super::{
    CreateApi, DeleteApi, Endpoint, EndpointOptions, GetApi, ListApi, RootKind, UpdateApi,
};
use crate::config::CollisionPolicy;
use crate::error::{ConfigError, StartupError};
use crate::model::CompiledModel;
use crate::schema::register_shared_types;
use async_graphql::dynamic::{Object, Schema};
use std::sync::Arc;

pub const QUERY_ROOT: &str = "Query";
pub const MUTATION_ROOT: &str = "Mutation";

pub struct ApiSurfaceBuilder {
    policy: CollisionPolicy,
    query: Vec<Endpoint>,
    mutation: Vec<Endpoint>,
    models: Vec<Arc<CompiledModel>>,
}

impl ApiSurfaceBuilder {
    pub fn new(policy: CollisionPolicy) -> Self {
        ApiSurfaceBuilder {
            policy,
            query: Vec::new(),
            mutation: Vec::new(),
            models: Vec::new(),
        }
    }

    /// Under `Reject` a repeated (root, name) is an error; under `LastWins` it replaces the
    /// earlier entry in place.
    pub fn add(&mut self, endpoint: Endpoint) -> Result<(), ConfigError> {
        let policy = self.policy;
        let fields = match endpoint.root {
            RootKind::Query => &mut self.query,
            RootKind::Mutation => &mut self.mutation,
        };
        match fields.iter().position(|e| e.name == endpoint.name) {
            None => fields.push(endpoint),
            Some(_) if policy == CollisionPolicy::Reject => {
                return Err(ConfigError::DuplicateOperation {
                    root: endpoint.root.as_str(),
                    name: endpoint.name,
                });
            }
            Some(i) => {
                tracing::warn!(
                    root = endpoint.root.as_str(),
                    name = %endpoint.name,
                    previous = %fields[i].model,
                    model = %endpoint.model,
                    "operation redefined, later model wins"
                );
                fields[i] = endpoint;
            }
        }
        Ok(())
    }

    /// All five endpoints for a model, plus its GraphQL types.
    pub fn add_model(
        &mut self,
        model: &Arc<CompiledModel>,
        options: &EndpointOptions,
    ) -> Result<(), ConfigError> {
        self.add(CreateApi::build(model, options))?;
        self.add(GetApi::build(model, options))?;
        self.add(UpdateApi::build(model, options))?;
        self.add(DeleteApi::build(model, options))?;
        self.add(ListApi::build(model, options))?;
        self.add_types(model)
    }

    fn add_types(&mut self, model: &Arc<CompiledModel>) -> Result<(), ConfigError> {
        let names = model.graphql.type_names();
        let clash = self
            .models
            .iter()
            .position(|m| m.graphql.type_names().iter().any(|n| names.contains(n)));
        match clash {
            None => self.models.push(model.clone()),
            Some(i) if self.policy == CollisionPolicy::Reject => {
                let taken = self.models[i].graphql.type_names();
                let name = names
                    .iter()
                    .find(|n| taken.contains(n))
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| model.name.clone());
                return Err(ConfigError::DuplicateType(name));
            }
            Some(i) => {
                tracing::warn!(
                    previous = %self.models[i].name,
                    model = %model.name,
                    "graphql types redefined, later model wins"
                );
                self.models[i] = model.clone();
            }
        }
        Ok(())
    }

    pub fn finish(self) -> ApiSurface {
        ApiSurface {
            query: self.query,
            mutation: self.mutation,
            models: self.models,
        }
    }
}

/// Finalized root fields. Immutable once built.
pub struct ApiSurface {
    query: Vec<Endpoint>,
    mutation: Vec<Endpoint>,
    models: Vec<Arc<CompiledModel>>,
}

impl std::fmt::Debug for ApiSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSurface")
            .field("query", &self.query)
            .field("mutation", &self.mutation)
            .field("models", &self.models.iter().map(|m| &m.name).collect::<Vec<_>>())
            .finish()
    }
}

impl ApiSurface {
    pub fn query_fields(&self) -> impl Iterator<Item = &str> {
        self.query.iter().map(|e| e.name.as_str())
    }

    pub fn mutation_fields(&self) -> impl Iterator<Item = &str> {
        self.mutation.iter().map(|e| e.name.as_str())
    }

    pub fn endpoint(&self, root: RootKind, name: &str) -> Option<&Endpoint> {
        let fields = match root {
            RootKind::Query => &self.query,
            RootKind::Mutation => &self.mutation,
        };
        fields.iter().find(|e| e.name == name)
    }

    pub fn models(&self) -> &[Arc<CompiledModel>] {
        &self.models
    }

    pub fn into_schema(self) -> Result<Schema, StartupError> {
        let query = self
            .query
            .into_iter()
            .fold(Object::new(QUERY_ROOT), |obj, e| obj.field(e.field));
        let mutation = self
            .mutation
            .into_iter()
            .fold(Object::new(MUTATION_ROOT), |obj, e| obj.field(e.field));
        let mut builder = Schema::build(QUERY_ROOT, Some(MUTATION_ROOT), None)
            .register(query)
            .register(mutation);
        builder = register_shared_types(builder);
        for model in &self.models {
            builder = model.graphql.register(builder);
        }
        builder.finish().map_err(|e| StartupError::Schema(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, ModelDefinitionConfig};
    use crate::model::compile_models;
    use crate::store::Connection;

    fn models(configs: Vec<ModelDefinitionConfig>) -> Vec<Arc<CompiledModel>> {
        compile_models(&configs, &Connection::new()).unwrap()
    }

    #[test]
    fn five_fields_per_model() {
        let compiled = models(vec![
            ModelDefinitionConfig::new("Task").field("title", FieldConfig::new("string")),
        ]);
        let mut builder = ApiSurfaceBuilder::new(CollisionPolicy::Reject);
        builder.add_model(&compiled[0], &EndpointOptions::default()).unwrap();
        let surface = builder.finish();
        assert_eq!(surface.query_fields().collect::<Vec<_>>(), ["getTask", "listTask"]);
        assert_eq!(
            surface.mutation_fields().collect::<Vec<_>>(),
            ["createTask", "updateTask", "deleteTask"]
        );
        assert!(surface.into_schema().is_ok());
    }

    #[test]
    fn duplicate_operation_rejected_by_default() {
        let compiled = models(vec![
            ModelDefinitionConfig::new("X").field("a", FieldConfig::new("string")),
            ModelDefinitionConfig::new("X").field("b", FieldConfig::new("string")),
        ]);
        let mut builder = ApiSurfaceBuilder::new(CollisionPolicy::default());
        builder.add_model(&compiled[0], &EndpointOptions::default()).unwrap();
        let err = builder.add_model(&compiled[1], &EndpointOptions::default()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateOperation { name, .. } if name == "createX"));
    }

    #[test]
    fn last_wins_replaces_in_place() {
        let compiled = models(vec![
            ModelDefinitionConfig::new("X").field("a", FieldConfig::new("string")),
            ModelDefinitionConfig::new("X").field("b", FieldConfig::new("string")),
        ]);
        let mut builder = ApiSurfaceBuilder::new(CollisionPolicy::LastWins);
        for m in &compiled {
            builder.add_model(m, &EndpointOptions::default()).unwrap();
        }
        let surface = builder.finish();
        assert_eq!(surface.query_fields().count(), 2);
        assert_eq!(surface.mutation_fields().count(), 3);
        assert_eq!(surface.models().len(), 1);
        assert!(surface.models()[0].definition.field("b").is_some());
    }
}
