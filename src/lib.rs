//! Dryer: GraphQL CRUD server generated from declarative model definitions.
//!
//! Each model gets a storage collection, GraphQL object and input types, and five root
//! fields: `createX`, `getX`, `updateX`, `deleteX`, `listX`.

pub mod api;
pub mod app;
pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod schema;
pub mod sql;
pub mod state;
pub mod store;

pub use api::{
    ApiSurface, ApiSurfaceBuilder, Endpoint, EndpointHooks, EndpointOptions, HookContext, Operation,
    RootKind,
};
pub use app::{Dryer, ServerHandle, StartupPhase};
pub use config::{
    load_definitions_from_dir, parse_definitions, CollisionPolicy, FieldConfig,
    ModelDefinitionConfig, StartupConfig,
};
pub use error::{AppError, BoxError, ConfigError, StartupError};
pub use model::{compile_models, CompiledModel};
pub use routes::app_routes;
pub use schema::{GraphqlTypeBuilder, PersistenceSchemaBuilder};
pub use state::AppState;
pub use store::{Connection, Document};
