#![allow(dead_code)]

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Variables};
use dryer::store::ConnectOptions;
use dryer::{CollisionPolicy, Connection, Dryer, FieldConfig, ModelDefinitionConfig, StartupConfig};
use serde_json::{json, Value};

pub fn task_model() -> ModelDefinitionConfig {
    ModelDefinitionConfig::new("Task")
        .field("title", FieldConfig::new("string").required())
        .field("done", FieldConfig::new("boolean").with_default(json!(false)))
}

pub fn startup_config(defs: Vec<ModelDefinitionConfig>) -> StartupConfig {
    StartupConfig::new(defs, "memory://", 0).host("127.0.0.1")
}

/// Compile, connect to an in-memory store and build the executable schema.
pub async fn memory_schema(dryer: &Dryer) -> (Schema, Connection) {
    let connection = Connection::new();
    let surface = dryer.compile(&connection).unwrap();
    connection
        .connect("memory://", &ConnectOptions::default())
        .await
        .unwrap();
    for model in surface.models() {
        model.collection.ensure().await.unwrap();
    }
    (surface.into_schema().unwrap(), connection)
}

pub async fn schema_for(defs: Vec<ModelDefinitionConfig>, policy: CollisionPolicy) -> Schema {
    let dryer = Dryer::init(startup_config(defs).collision_policy(policy));
    memory_schema(&dryer).await.0
}

/// Execute and return the JSON response (`data` and `errors`).
pub async fn exec(schema: &Schema, query: &str, variables: Value) -> Value {
    let response = schema
        .execute(Request::new(query).variables(Variables::from_json(variables)))
        .await;
    serde_json::to_value(&response).unwrap()
}

pub fn error_code(response: &Value) -> Option<&str> {
    response["errors"][0]["extensions"]["code"].as_str()
}
