//! `get<Name>(id)`: fetch one record; a missing id is a NotFound error.

use super::{id_arg, request_auth, Endpoint, EndpointOptions, HookContext, Operation};
use crate::error::AppError;
use crate::model::CompiledModel;
use crate::store::Document;
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, TypeRef};
use async_graphql::ErrorExtensions;
use std::sync::Arc;

pub struct GetApi;

impl GetApi {
    pub fn build(model: &Arc<CompiledModel>, options: &EndpointOptions) -> Endpoint {
        let name = Operation::Get.field_name(&model.name);
        let resolver_model = model.clone();
        let resolver_options = options.clone();
        let field = Field::new(
            name.clone(),
            TypeRef::named(model.graphql.object.name.clone()),
            move |ctx| {
                let model = resolver_model.clone();
                let options = resolver_options.clone();
                FieldFuture::new(async move {
                    let id = id_arg(&ctx)?;
                    let auth = request_auth(&ctx);
                    let doc = Self::get(&model, &options, &id, auth.as_deref())
                        .await
                        .map_err(|e| e.extend())?;
                    Ok(Some(FieldValue::owned_any(doc)))
                })
            },
        )
        .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)));
        Endpoint {
            root: Operation::Get.root(),
            name,
            model: model.name.clone(),
            operation: Operation::Get,
            field,
        }
    }

    pub async fn get(
        model: &CompiledModel,
        options: &EndpointOptions,
        id: &str,
        auth: Option<&str>,
    ) -> Result<Document, AppError> {
        let hook_ctx = HookContext {
            operation: Operation::Get,
            model: &model.name,
            id: Some(id),
            auth,
        };
        options.authorize(&hook_ctx).await?;
        model
            .collection
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(&model.name, id))
    }
}
