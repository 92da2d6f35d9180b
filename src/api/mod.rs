//! CRUD endpoints: one builder per operation, plus the surface that collects them.

mod create;
mod delete;
mod get;
mod list;
mod surface;
mod update;
mod validation;

pub use create::CreateApi;
pub use delete::DeleteApi;
pub use get::GetApi;
pub use list::{ListApi, Pagination, DEFAULT_LIMIT, MAX_LIMIT};
pub use surface::{ApiSurface, ApiSurfaceBuilder};
pub use update::UpdateApi;
pub use validation::RequestValidator;

use crate::error::AppError;
use crate::store::Document;
use async_graphql::dynamic::{Field, ResolverContext};
use async_graphql::{ErrorExtensions, Value as ConstValue};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Get,
    Update,
    Delete,
    List,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Get,
        Operation::Update,
        Operation::Delete,
        Operation::List,
    ];

    pub fn root(self) -> RootKind {
        match self {
            Operation::Get | Operation::List => RootKind::Query,
            Operation::Create | Operation::Update | Operation::Delete => RootKind::Mutation,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        }
    }

    /// Root field name, e.g. `createTask`.
    pub fn field_name(self, model: &str) -> String {
        format!("{}{}", self.prefix(), model)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RootKind {
    Query,
    Mutation,
}

impl RootKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RootKind::Query => "query",
            RootKind::Mutation => "mutation",
        }
    }
}

/// One root field and the resolver behind it.
pub struct Endpoint {
    pub root: RootKind,
    pub name: String,
    pub model: String,
    pub operation: Operation,
    pub field: Field,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("root", &self.root)
            .field("name", &self.name)
            .field("model", &self.model)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// Raw `Authorization` header of the current request, when present.
#[derive(Clone, Debug)]
pub struct RequestAuth(pub String);

pub struct HookContext<'a> {
    pub operation: Operation,
    pub model: &'a str,
    pub id: Option<&'a str>,
    pub auth: Option<&'a str>,
}

/// Per-model extension points. Every method defaults to a no-op.
#[async_trait]
pub trait EndpointHooks: Send + Sync {
    /// Runs first on every operation.
    async fn authorize(&self, _ctx: &HookContext<'_>) -> Result<(), AppError> {
        Ok(())
    }

    /// Create and update only, before the write. Receives the input or the patch.
    /// The document is validated again after the hook returns.
    async fn before_save(
        &self,
        _ctx: &HookContext<'_>,
        _doc: &mut Document,
    ) -> Result<(), AppError> {
        Ok(())
    }

    /// Create and update only, after the write. Receives the stored record.
    ///
    /// The write is already committed when this runs: an error here is returned to the
    /// client, but the record stays stored.
    async fn after_save(
        &self,
        _ctx: &HookContext<'_>,
        _doc: &Document,
    ) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct EndpointOptions {
    pub hooks: Option<Arc<dyn EndpointHooks>>,
}

impl EndpointOptions {
    pub fn with_hooks(hooks: Arc<dyn EndpointHooks>) -> Self {
        EndpointOptions { hooks: Some(hooks) }
    }

    pub(crate) async fn authorize(&self, ctx: &HookContext<'_>) -> Result<(), AppError> {
        match &self.hooks {
            Some(h) => h.authorize(ctx).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn before_save(
        &self,
        ctx: &HookContext<'_>,
        doc: &mut Document,
    ) -> Result<(), AppError> {
        match &self.hooks {
            Some(h) => h.before_save(ctx, doc).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn after_save(
        &self,
        ctx: &HookContext<'_>,
        doc: &Document,
    ) -> Result<(), AppError> {
        match &self.hooks {
            Some(h) => h.after_save(ctx, doc).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for EndpointOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointOptions")
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

fn request_auth(ctx: &ResolverContext<'_>) -> Option<String> {
    ctx.data_opt::<RequestAuth>().map(|a| a.0.clone())
}

/// `ID` accepts both string and integer literals.
fn id_arg(ctx: &ResolverContext<'_>) -> async_graphql::Result<String> {
    let id = ctx.args.try_get("id")?;
    match id.as_value() {
        ConstValue::String(s) => Ok(s.clone()),
        ConstValue::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        _ => Err(AppError::Validation("id must be a string or an integer".into()).extend()),
    }
}

/// Object argument as a document; missing or null becomes an empty document.
fn document_arg(ctx: &ResolverContext<'_>, name: &str) -> async_graphql::Result<Document> {
    let Some(arg) = ctx.args.get(name) else {
        return Ok(Document::new());
    };
    match arg.as_value().clone().into_json()? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Document::new()),
        _ => Err(async_graphql::Error::new(format!("{} must be an object", name))),
    }
}
