//! Raw config types: the model definition JSON format and the startup configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// One entity as written by the application author.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelDefinitionConfig {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub default: Option<Value>,
    /// Target model name for `reference` fields and `reference` array items.
    #[serde(default, rename = "ref")]
    pub ref_: Option<String>,
    /// Element type for `array` fields.
    #[serde(default)]
    pub items: Option<String>,
}

impl FieldConfig {
    pub fn new(type_: impl Into<String>) -> Self {
        FieldConfig {
            type_: type_.into(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_ref(mut self, model: impl Into<String>) -> Self {
        self.ref_ = Some(model.into());
        self
    }

    pub fn with_items(mut self, items: impl Into<String>) -> Self {
        self.items = Some(items.into());
        self
    }
}

impl ModelDefinitionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        ModelDefinitionConfig {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldConfig) -> Self {
        self.fields.insert(name.into(), field);
        self
    }
}

/// What happens when two endpoints claim the same root field name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    #[default]
    Reject,
    LastWins,
}

#[derive(Clone, Debug)]
pub struct StartupConfig {
    /// Compiled in this order; under last-wins a later model replaces an earlier one.
    pub model_definitions: Vec<ModelDefinitionConfig>,
    /// `postgres://…`, `postgresql://…` or `memory://`.
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub max_connections: u32,
    pub body_limit: usize,
    pub collision_policy: CollisionPolicy,
}

impl StartupConfig {
    pub fn new(
        model_definitions: Vec<ModelDefinitionConfig>,
        database_url: impl Into<String>,
        port: u16,
    ) -> Self {
        StartupConfig {
            model_definitions,
            database_url: database_url.into(),
            host: "0.0.0.0".into(),
            port,
            connect_timeout: Duration::from_secs(30),
            max_connections: 5,
            body_limit: 1024 * 1024,
            collision_policy: CollisionPolicy::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }
}
