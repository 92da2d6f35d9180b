//! `list<Name>(filter, pagination)`: exact-match filter, creation order, bounded page.

use super::{
    document_arg, request_auth, Endpoint, EndpointOptions, HookContext, Operation, RequestValidator,
};
use crate::error::AppError;
use crate::model::CompiledModel;
use crate::schema::graphql::PAGINATION_INPUT;
use crate::store::{Document, ListQuery};
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, TypeRef};
use async_graphql::ErrorExtensions;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    fn from_document(doc: &Document) -> Result<Self, AppError> {
        let int = |key: &str| -> Result<Option<i64>, AppError> {
            match doc.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => v
                    .as_i64()
                    .map(Some)
                    .ok_or_else(|| AppError::Validation(format!("{} must be an integer", key))),
            }
        };
        Ok(Pagination {
            limit: int("limit")?,
            offset: int("offset")?,
        })
    }

    /// Limit defaults to 100 and is capped at 1000; offset defaults to 0.
    fn resolve(&self) -> Result<(u32, u32), AppError> {
        let limit = match self.limit {
            None => DEFAULT_LIMIT,
            Some(n) if n < 0 => {
                return Err(AppError::Validation("limit must not be negative".into()))
            }
            Some(n) => n.min(MAX_LIMIT as i64) as u32,
        };
        let offset = match self.offset {
            None => 0,
            Some(n) if n < 0 => {
                return Err(AppError::Validation("offset must not be negative".into()))
            }
            Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
        };
        Ok((limit, offset))
    }
}

pub struct ListApi;

impl ListApi {
    pub fn build(model: &Arc<CompiledModel>, options: &EndpointOptions) -> Endpoint {
        let name = Operation::List.field_name(&model.name);
        let resolver_model = model.clone();
        let resolver_options = options.clone();
        let mut field = Field::new(
            name.clone(),
            TypeRef::named_nn_list_nn(model.graphql.object.name.clone()),
            move |ctx| {
                let model = resolver_model.clone();
                let options = resolver_options.clone();
                FieldFuture::new(async move {
                    let filter = document_arg(&ctx, "filter")?;
                    let pagination = Pagination::from_document(&document_arg(&ctx, "pagination")?)
                        .map_err(|e| e.extend())?;
                    let auth = request_auth(&ctx);
                    let docs = Self::list(&model, &options, filter, pagination, auth.as_deref())
                        .await
                        .map_err(|e| e.extend())?;
                    Ok(Some(FieldValue::list(docs.into_iter().map(FieldValue::owned_any))))
                })
            },
        );
        if let Some(filter) = &model.graphql.filter_input {
            field = field.argument(InputValue::new("filter", TypeRef::named(filter.name.clone())));
        }
        field = field.argument(InputValue::new("pagination", TypeRef::named(PAGINATION_INPUT)));
        Endpoint {
            root: Operation::List.root(),
            name,
            model: model.name.clone(),
            operation: Operation::List,
            field,
        }
    }

    pub async fn list(
        model: &CompiledModel,
        options: &EndpointOptions,
        filter: Document,
        pagination: Pagination,
        auth: Option<&str>,
    ) -> Result<Vec<Document>, AppError> {
        let hook_ctx = HookContext {
            operation: Operation::List,
            model: &model.name,
            id: None,
            auth,
        };
        options.authorize(&hook_ctx).await?;
        RequestValidator::validate_partial(&filter, &model.definition, false)?;
        if let Some(name) = filter
            .keys()
            .find(|k| model.definition.field(k).map(|f| f.kind.is_array()).unwrap_or(false))
        {
            return Err(AppError::Validation(format!("cannot filter on array field '{}'", name)));
        }
        let (limit, offset) = pagination.resolve()?;
        let query = ListQuery {
            filters: filter.into_iter().collect(),
            limit,
            offset,
        };
        model.collection.list(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(Pagination::default().resolve().unwrap(), (DEFAULT_LIMIT, 0));
        let big = Pagination { limit: Some(5000), offset: Some(7) };
        assert_eq!(big.resolve().unwrap(), (MAX_LIMIT, 7));
        let negative = Pagination { limit: Some(-1), offset: None };
        assert!(matches!(negative.resolve(), Err(AppError::Validation(_))));
    }
}
