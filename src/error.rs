//! Typed errors: definition-time, per-request and startup.

use async_graphql::ErrorExtensions;
use std::time::Duration;
use thiserror::Error;

use crate::app::StartupPhase;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Problems found in model definitions or while assembling the API surface.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("model '{model}': field '{field}' has unsupported type '{type_name}'")]
    UnsupportedType {
        model: String,
        field: String,
        type_name: String,
    },
    #[error("model '{model}': field '{field}' references unknown model '{target}'")]
    MissingReference {
        model: String,
        field: String,
        target: String,
    },
    #[error("duplicate {root} field: {name}")]
    DuplicateOperation { root: &'static str, name: String },
    #[error("duplicate type: {0}")]
    DuplicateType(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Errors raised while serving a single resolver call.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not found: {model} '{id}'")]
    NotFound { model: String, id: String },
    #[error("persistence: {0}")]
    Persistence(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
        }
    }

    pub fn not_found(model: &str, id: &str) -> Self {
        AppError::NotFound {
            model: model.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "database error");
        AppError::Persistence("storage operation failed".into())
    }
}

impl ErrorExtensions for AppError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

/// Fatal errors that stop the process before it reaches the serving state.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unsupported database url scheme: '{0}'")]
    UnsupportedDatabase(String),
    #[error("database connect: {0}")]
    Connect(String),
    #[error("database connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("database already connected")]
    AlreadyConnected,
    #[error("collection setup: {0}")]
    Collection(#[from] AppError),
    #[error("schema: {0}")]
    Schema(String),
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{phase} hook failed: {source}")]
    Hook {
        phase: StartupPhase,
        #[source]
        source: BoxError,
    },
    #[error("server: {0}")]
    Server(#[from] std::io::Error),
}
